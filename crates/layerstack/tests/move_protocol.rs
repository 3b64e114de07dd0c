//! End-to-end scenarios for structural edits and the move protocol.
//!
//! Run with `RUST_LOG=layerstack=trace` to see resolver traces.

use layerstack::{
    LayerItem, LayerStack, LayerStackConfig, LayerStackError, MoveEndMethod, MovePhase,
    SnapSource,
};
use tracing_subscriber::EnvFilter;

const EPS: f64 = 1e-6;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn positions(stack: &LayerStack) -> Vec<f64> {
    stack.layers().iter().map(LayerItem::current_position).collect()
}

fn assert_close(actual: &[f64], expected: &[f64]) {
    assert_eq!(actual.len(), expected.len(), "{actual:?} vs {expected:?}");
    for (a, e) in actual.iter().zip(expected) {
        assert!((a - e).abs() < EPS, "{actual:?} vs {expected:?}");
    }
}

/// Root without trailing gap and a detail layer with three rest points.
fn pointed_stack(total: f64) -> LayerStack {
    let mut stack = LayerStack::new(LayerStackConfig::default(), total);
    stack
        .push(LayerItem::new(400.0).with_next_item_distance(0.0))
        .expect("push root");
    stack
        .push(
            LayerItem::new(300.0)
                .with_name("detail")
                .with_snapping_point(0.0, 0)
                .with_snapping_point(100.0, 0)
                .with_snapping_point(250.0, 0),
        )
        .expect("push detail");
    stack
}

#[test]
fn rightmost_explicit_point_wins_at_rest() {
    init_tracing();
    let stack = pointed_stack(1024.0);
    assert_close(&positions(&stack), &[0.0, 250.0]);
}

#[test]
fn end_methods_pick_nearest_leftmost_and_rightmost_points() {
    init_tracing();
    for (method, expected) in [
        (MoveEndMethod::Nearest, 100.0),
        (MoveEndMethod::Compact, 0.0),
        (MoveEndMethod::Expand, 250.0),
    ] {
        let mut stack = pointed_stack(1024.0);
        let ctx = stack.begin_move(1, 300.0).expect("begin");
        let update = stack.continue_move(&ctx, -130.0).expect("continue");
        assert_eq!(update.context.tentative_position(), 120.0);
        let offsets: Vec<f64> = update.context.candidates().iter().map(|c| c.offset).collect();
        assert_eq!(offsets, vec![0.0, 100.0, 250.0]);
        assert_eq!(update.context.chosen_snap_index(), Some(1));

        let outcome = stack.end_move(&update.context, method).expect("end");
        assert_eq!(outcome.position, expected, "{method:?}");
        assert!(matches!(
            outcome.target.map(|t| t.source),
            Some(SnapSource::Point { .. })
        ));
        assert_eq!(stack.phase(), MovePhase::Idle);
    }
}

#[test]
fn snapped_position_survives_resize_and_push_pop() {
    init_tracing();
    let mut stack = pointed_stack(1024.0);
    let ctx = stack.begin_move(1, 300.0).expect("begin");
    stack.continue_move(&ctx, -130.0).expect("continue");
    stack.end_move(&ctx, MoveEndMethod::Nearest).expect("end");
    assert_close(&positions(&stack), &[0.0, 100.0]);

    assert!(stack.set_width(800.0).is_empty());
    assert_close(&positions(&stack), &[0.0, 100.0]);

    stack.push(LayerItem::new(300.0)).expect("push");
    assert_close(&positions(&stack), &[0.0, 250.0, 500.0]);

    let popped = stack.pop().expect("pop");
    assert_eq!(popped.removed.len(), 1);
    assert_close(&positions(&stack), &[0.0, 100.0]);
}

#[test]
fn expand_stays_within_total_width() {
    init_tracing();
    let mut stack = LayerStack::new(LayerStackConfig::default(), 768.0);
    for width in [400.0, 300.0, 300.0, 300.0] {
        stack.push(LayerItem::new(width)).expect("push");
    }
    let ctx = stack.begin_move(3, 500.0).expect("begin");
    let outcome = stack.end_move(&ctx, MoveEndMethod::Expand).expect("end");
    assert!(outcome.position <= stack.total_width() + EPS);
    assert_eq!(outcome.target.map(|t| t.source), Some(SnapSource::Expanded));
    assert!(stack.layers().iter().all(|l| l.current_width() >= 0.0));
}

#[test]
fn velocity_flick_expands_and_slow_release_snaps_nearest() {
    init_tracing();
    let mut stack = pointed_stack(1024.0);
    let ctx = stack.begin_move(1, 300.0).expect("begin");
    stack.continue_move(&ctx, -200.0).expect("continue");
    let outcome = stack.end_move_with_velocity(&ctx, 500.0).expect("end");
    assert_eq!(outcome.position, 250.0);

    let ctx = stack.begin_move(1, 300.0).expect("begin");
    stack.continue_move(&ctx, -140.0).expect("continue");
    let outcome = stack.end_move_with_velocity(&ctx, 20.0).expect("end");
    assert_eq!(outcome.position, 100.0);
}

#[test]
fn cancel_returns_to_start_and_allows_new_gesture() {
    init_tracing();
    let mut stack = pointed_stack(1024.0);
    let start = stack.geometry();
    let ctx = stack.begin_move(1, 300.0).expect("begin");
    stack.continue_move(&ctx, -200.0).expect("continue");
    let ops = stack.cancel_move(&ctx).expect("cancel");
    assert_eq!(ops.len(), 1);
    assert_eq!(ops[0].x_translation, 200.0);
    assert_eq!(stack.geometry(), start);

    let next = stack.begin_move(1, 300.0).expect("new gesture");
    assert!(next.gesture() > ctx.gesture());
    assert!(matches!(
        stack.continue_move(&ctx, 1.0),
        Err(LayerStackError::InvalidState { .. })
    ));
}

#[test]
fn abandoned_gesture_blocks_structural_changes_until_cancelled() {
    init_tracing();
    let mut stack = pointed_stack(1024.0);
    let _abandoned = stack.begin_move(1, 300.0).expect("begin");
    let err = stack.push(LayerItem::new(100.0)).expect_err("push while moving");
    assert!(err.to_string().contains("push not allowed"));
    assert!(stack.force_cancel_move().is_some());
    stack.push(LayerItem::new(100.0)).expect("push after cancel");
}

#[test]
fn expandable_root_fills_viewport() {
    init_tracing();
    let config = LayerStackConfig::default();
    let mut stack = LayerStack::new(config, 1024.0);
    stack.push(config.expandable_item()).expect("push root");
    assert_eq!(stack.layers()[0].current_width(), 1024.0);

    stack.push(config.item(300.0)).expect("push");
    assert_close(&positions(&stack), &[0.0, 724.0]);
    assert_eq!(stack.layers()[0].current_width(), 1024.0);
}

#[test]
fn custom_standard_distance_sets_initial_positions() {
    init_tracing();
    let config = LayerStackConfig {
        standard_distance: 32.0,
        ..LayerStackConfig::default()
    };
    let mut stack = LayerStack::new(config, 1024.0);
    for width in [400.0, 300.0, 300.0] {
        stack.push(LayerItem::new(width)).expect("push");
    }
    let initial: Vec<f64> = stack.layers().iter().map(LayerItem::initial_position).collect();
    assert_close(&initial, &[0.0, 32.0, 64.0]);
}

#[test]
fn pushed_layer_operation_starts_at_initial_position() {
    init_tracing();
    let mut stack = LayerStack::new(LayerStackConfig::default(), 400.0);
    stack.push(LayerItem::new(400.0)).expect("push root");
    let outcome = stack.push(LayerItem::new(300.0)).expect("push");
    let op = outcome
        .operations
        .iter()
        .find(|op| op.layer == outcome.layer)
        .expect("new layer has an operation");
    let item = stack.layer(outcome.layer).expect("layer is present");
    assert_eq!(item.initial_position() + op.x_translation, item.current_position());
    assert_eq!(item.width() + op.width_change, item.current_width());
    assert_close(&positions(&stack), &[0.0, 100.0]);
}
