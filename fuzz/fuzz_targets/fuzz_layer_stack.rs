#![no_main]

use arbitrary::Arbitrary;
use layerstack::{LayerItem, LayerStack, LayerStackConfig, LayerStackError, MoveEndMethod};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
enum Op {
    Push {
        width: u16,
        distance: Option<u8>,
        expandable: bool,
        resize_on_move: bool,
        points: Vec<(i16, u8)>,
    },
    Pop,
    PopTo(u8),
    PopToRoot,
    SetWidth(u16),
    Begin(u8),
    Continue(i16),
    End(u8),
    EndWithVelocity(i16),
    Cancel,
}

fuzz_target!(|ops: Vec<Op>| {
    let mut stack = LayerStack::new(LayerStackConfig::default(), 1024.0);
    let mut ctx = None;

    for op in ops.into_iter().take(256) {
        match op {
            Op::Push {
                width,
                distance,
                expandable,
                resize_on_move,
                points,
            } => {
                let mut item = LayerItem::new(f64::from(width % 2048))
                    .with_expandable(expandable)
                    .with_resize_on_move(resize_on_move);
                if let Some(distance) = distance {
                    item = item.with_next_item_distance(f64::from(distance));
                }
                for (offset, priority) in points.into_iter().take(4) {
                    item.add_snapping_point(f64::from(offset), i32::from(priority));
                }
                let result = stack.push(item);
                assert_eq!(result.is_err(), ctx.is_some());
            }
            Op::Pop => match stack.pop() {
                Ok(outcome) => assert_eq!(outcome.removed.len(), 1),
                Err(LayerStackError::EmptyStack { depth }) => assert!(depth <= 1),
                Err(LayerStackError::InvalidState { .. }) => assert!(ctx.is_some()),
                Err(err) => panic!("unexpected pop error: {err}"),
            },
            Op::PopTo(pick) => {
                if let Some(id) = pick_id(&stack, pick) {
                    let _ = stack.pop_to(id);
                }
            }
            Op::PopToRoot => {
                let _ = stack.pop_to_root();
            }
            Op::SetWidth(width) => {
                let width = f64::from(width % 4096);
                stack.set_width(width);
                assert!(stack.set_width(width).is_empty(), "set_width must be idempotent");
            }
            Op::Begin(pick) => {
                if !stack.is_empty() {
                    let index = usize::from(pick) % stack.len();
                    match stack.begin_move(index, 0.0) {
                        Ok(context) => ctx = Some(context),
                        Err(_) => assert!(ctx.is_some()),
                    }
                }
            }
            Op::Continue(dx) => {
                if let Some(current) = ctx.take() {
                    let update = stack
                        .continue_move(&current, f64::from(dx))
                        .expect("active gesture accepts deltas");
                    ctx = Some(update.context);
                }
            }
            Op::End(method) => {
                if let Some(current) = ctx.take() {
                    let method = match method % 3 {
                        0 => MoveEndMethod::Nearest,
                        1 => MoveEndMethod::Compact,
                        _ => MoveEndMethod::Expand,
                    };
                    stack.end_move(&current, method).expect("active gesture ends");
                }
            }
            Op::EndWithVelocity(velocity) => {
                if let Some(current) = ctx.take() {
                    stack
                        .end_move_with_velocity(&current, f64::from(velocity))
                        .expect("active gesture ends");
                }
            }
            Op::Cancel => {
                if let Some(current) = ctx.take() {
                    stack.cancel_move(&current).expect("active gesture cancels");
                }
            }
        }

        check_invariants(&stack);
    }
});

fn pick_id(stack: &LayerStack, pick: u8) -> Option<layerstack::LayerId> {
    if stack.is_empty() {
        return None;
    }
    stack.layers()[usize::from(pick) % stack.len()].id()
}

fn check_invariants(stack: &LayerStack) {
    let layers = stack.layers();
    if let Some(root) = layers.first() {
        assert_eq!(root.current_position(), 0.0, "root left the origin");
    }
    for pair in layers.windows(2) {
        assert!(
            pair[0].current_position() <= pair[1].current_position(),
            "positions out of order"
        );
    }
    for item in layers {
        assert!(item.current_width() >= 0.0, "negative width");
        assert!(item.current_position().is_finite(), "non-finite position");
        assert!(item.current_width().is_finite(), "non-finite width");
    }
}
