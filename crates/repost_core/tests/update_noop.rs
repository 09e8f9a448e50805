use repost_core::{update, Msg, PipelineState, Stage};

#[test]
fn reset_from_idle_is_noop() {
    let state = PipelineState::new();
    let (mut next, effects) = update(state.clone(), Msg::Reset);
    assert!(effects.is_empty());
    assert_eq!(next.stage(), Stage::Idle);
    assert!(!next.consume_dirty());
    assert_eq!(next, state);
}
