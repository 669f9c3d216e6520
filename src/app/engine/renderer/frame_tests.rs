use super::*;
use crate::app::engine::renderer::mock::{Call, MockBackend, MockImage, MockPipeline, SEMAPHORES};

const VERTEX_ADDRESS: u64 = 0xdead_beef_0000;

fn tick(
    driver: &mut FrameDriver,
    backend: &mut MockBackend,
    pipeline: &MockPipeline,
    state: FrameState,
    size: Extent,
) -> (FrameState, FrameOutcome) {
    driver
        .tick(
            backend,
            state,
            FrameInputs {
                pipeline,
                vertex_buffer_address: VERTEX_ADDRESS,
                window_size: size,
            },
        )
        .unwrap()
}

fn setup() -> (FrameDriver, MockBackend, MockPipeline) {
    let backend = MockBackend::new(Extent::new(800, 600));
    let pipeline = MockPipeline::new("triangle", backend.log.clone());
    (FrameDriver::new(), backend, pipeline)
}

// ============================================================================
// Steady-state frames
// ============================================================================

#[test]
fn test_first_tick_draws_one_triangle() {
    let (mut driver, mut backend, pipeline) = setup();
    let size = Extent::new(800, 600);

    let (state, outcome) = tick(&mut driver, &mut backend, &pipeline, FrameState::default(), size);

    assert_eq!(outcome, FrameOutcome::Presented);
    assert_eq!(state, FrameState::default());
    assert_eq!(driver.phase(), FramePhase::Idle);
    assert_eq!(backend.submit_count(), 1);
    assert_eq!(backend.draw_count(), 1);
    assert!(backend.calls().contains(&Call::BeginRenderPass {
        image: 0,
        clear_color: [0.0, 0.0, 0.0, 1.0],
        render_area: Extent::new(800, 600),
    }));
}

#[test]
fn test_frame_call_sequence() {
    let (mut driver, mut backend, pipeline) = setup();
    let (acquire, present, timeline) = SEMAPHORES;

    tick(&mut driver, &mut backend, &pipeline, FrameState::default(), Extent::new(800, 600));

    assert_eq!(
        backend.calls(),
        vec![
            Call::Acquire,
            Call::CreateRecorder,
            Call::BeginRenderPass {
                image: 0,
                clear_color: CLEAR_COLOR,
                render_area: Extent::new(800, 600),
            },
            Call::SetPipeline("triangle"),
            Call::PushConstant(VERTEX_ADDRESS.to_ne_bytes().to_vec()),
            Call::Draw(DrawInfo {
                vertex_count: 3,
                instance_count: 1,
                first_vertex: 0,
                first_instance: 0,
            }),
            Call::EndRenderPass,
            Call::Complete,
            Call::Submit {
                wait_binary: vec![acquire],
                signal_binary: vec![present],
                signal_timeline: vec![(timeline, 1)],
            },
            Call::Present {
                wait_binary: vec![present],
            },
            Call::CollectGarbage,
        ]
    );
}

#[test]
fn test_unchanged_ticks_draw_once_each() {
    let (mut driver, mut backend, pipeline) = setup();
    let mut state = FrameState::default();

    for frame in 1..=5 {
        let (next, outcome) = tick(&mut driver, &mut backend, &pipeline, state, Extent::new(800, 600));
        assert_eq!(outcome, FrameOutcome::Presented);
        assert_eq!(backend.draw_count(), frame);
        state = next;
    }

    assert_eq!(driver.frames_presented(), 5);
    assert_eq!(backend.resize_count, 0);
    assert_eq!(
        backend.count(|call| matches!(call, Call::Draw(info) if info.vertex_count == 3)),
        5
    );
}

#[test]
fn test_timeline_value_advances_per_frame() {
    let (mut driver, mut backend, pipeline) = setup();
    let (_, _, timeline) = SEMAPHORES;

    tick(&mut driver, &mut backend, &pipeline, FrameState::default(), Extent::new(800, 600));
    tick(&mut driver, &mut backend, &pipeline, FrameState::default(), Extent::new(800, 600));

    let values: Vec<_> = backend
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            Call::Submit { signal_timeline, .. } => Some(signal_timeline),
            _ => None,
        })
        .collect();
    assert_eq!(values, vec![vec![(timeline, 1)], vec![(timeline, 2)]]);
}

// ============================================================================
// Resize handling
// ============================================================================

#[test]
fn test_out_of_date_flag_resizes_and_skips() {
    let (mut driver, mut backend, pipeline) = setup();
    let state = FrameState::default().mark_out_of_date();

    let (next, outcome) = tick(&mut driver, &mut backend, &pipeline, state, Extent::new(1024, 768));

    assert_eq!(outcome, FrameOutcome::Resized);
    assert!(!next.swapchain_out_of_date);
    assert_eq!(backend.draw_count(), 0);
    assert_eq!(backend.submit_count(), 0);
    assert_eq!(backend.calls(), vec![Call::Acquire, Call::Resize(Extent::new(1024, 768))]);
}

#[test]
fn test_acquire_out_of_date_resizes() {
    let (mut driver, mut backend, pipeline) = setup();
    backend.acquire_script.push_back(AcquireResult::OutOfDate);

    let (next, outcome) = tick(&mut driver, &mut backend, &pipeline, FrameState::default(), Extent::new(640, 480));

    assert_eq!(outcome, FrameOutcome::Resized);
    assert_eq!(next, FrameState::default());
    assert_eq!(backend.size, Extent::new(640, 480));
    assert_eq!(backend.draw_count(), 0);
}

#[test]
fn test_acquire_suboptimal_resizes() {
    let (mut driver, mut backend, pipeline) = setup();
    backend.acquire_script.push_back(AcquireResult::Suboptimal);

    let (_, outcome) = tick(&mut driver, &mut backend, &pipeline, FrameState::default(), Extent::new(800, 600));

    assert_eq!(outcome, FrameOutcome::Resized);
    assert_eq!(backend.resize_count, 1);
    assert_eq!(backend.submit_count(), 0);
}

#[test]
fn test_flag_wins_over_acquired_image() {
    let (mut driver, mut backend, pipeline) = setup();
    backend.acquire_script.push_back(AcquireResult::Image(MockImage(2)));
    let state = FrameState::default().mark_out_of_date();

    let (_, outcome) = tick(&mut driver, &mut backend, &pipeline, state, Extent::new(800, 600));

    assert_eq!(outcome, FrameOutcome::Resized);
    assert_eq!(backend.draw_count(), 0);
}

#[test]
fn test_flag_wins_over_empty_image() {
    let (mut driver, mut backend, pipeline) = setup();
    backend.acquire_script.push_back(AcquireResult::Empty);
    let state = FrameState::default().mark_out_of_date();

    let (next, outcome) = tick(&mut driver, &mut backend, &pipeline, state, Extent::new(800, 600));

    assert_eq!(outcome, FrameOutcome::Resized);
    assert!(!next.swapchain_out_of_date);
}

#[test]
fn test_draws_again_after_resize() {
    let (mut driver, mut backend, pipeline) = setup();
    let state = FrameState::default().mark_out_of_date();

    let (state, _) = tick(&mut driver, &mut backend, &pipeline, state, Extent::new(300, 200));
    let (_, outcome) = tick(&mut driver, &mut backend, &pipeline, state, Extent::new(300, 200));

    assert_eq!(outcome, FrameOutcome::Presented);
    assert_eq!(backend.draw_count(), 1);
    assert!(backend.calls().contains(&Call::BeginRenderPass {
        image: 0,
        clear_color: CLEAR_COLOR,
        render_area: Extent::new(300, 200),
    }));
}

// ============================================================================
// Transient unavailability and errors
// ============================================================================

#[test]
fn test_empty_image_skips_without_touching_flag() {
    let (mut driver, mut backend, pipeline) = setup();
    backend.acquire_script.push_back(AcquireResult::Empty);

    let (next, outcome) = tick(&mut driver, &mut backend, &pipeline, FrameState::default(), Extent::new(800, 600));

    assert_eq!(outcome, FrameOutcome::Skipped);
    assert_eq!(next, FrameState::default());
    assert_eq!(backend.draw_count(), 0);
    assert_eq!(backend.resize_count, 0);
    assert_eq!(backend.calls(), vec![Call::Acquire]);
}

#[test]
fn test_acquire_error_propagates_and_returns_to_idle() {
    let (mut driver, mut backend, pipeline) = setup();
    backend.fail_acquire = true;

    let result = driver.tick(
        &mut backend,
        FrameState::default(),
        FrameInputs {
            pipeline: &pipeline,
            vertex_buffer_address: VERTEX_ADDRESS,
            window_size: Extent::new(800, 600),
        },
    );

    assert!(result.is_err());
    assert_eq!(driver.phase(), FramePhase::Idle);
    assert_eq!(driver.frames_presented(), 0);
}

#[test]
fn test_mark_out_of_date_is_sticky() {
    let state = FrameState::default().mark_out_of_date().mark_out_of_date();
    assert!(state.swapchain_out_of_date);
}

#[test]
fn test_timeline_values_stay_contiguous_across_resize_skips() {
    let (mut driver, mut backend, pipeline) = setup();
    let (_, _, timeline) = SEMAPHORES;
    let size = Extent::new(800, 600);

    let (state, _) = tick(&mut driver, &mut backend, &pipeline, FrameState::default(), size);
    // A window drag: every tick sees a fresh viewport change.
    let (state, _) = tick(&mut driver, &mut backend, &pipeline, state.mark_out_of_date(), size);
    let (state, _) = tick(&mut driver, &mut backend, &pipeline, state.mark_out_of_date(), size);
    let (_, outcome) = tick(&mut driver, &mut backend, &pipeline, state, size);

    assert_eq!(outcome, FrameOutcome::Presented);
    let values: Vec<_> = backend
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            Call::Submit { signal_timeline, .. } => Some(signal_timeline),
            _ => None,
        })
        .collect();
    assert_eq!(values, vec![vec![(timeline, 1)], vec![(timeline, 2)]]);
}

#[test]
fn test_failed_recording_discards_commands() {
    let (mut driver, mut backend, pipeline) = setup();
    backend.fail_draw = true;

    let result = driver.tick(
        &mut backend,
        FrameState::default(),
        FrameInputs {
            pipeline: &pipeline,
            vertex_buffer_address: VERTEX_ADDRESS,
            window_size: Extent::new(800, 600),
        },
    );

    assert!(result.is_err());
    assert_eq!(driver.phase(), FramePhase::Idle);
    assert_eq!(backend.submit_count(), 0);
    assert_eq!(backend.count(|call| *call == Call::DiscardCommands), 1);
}
