//! E2E tests for the diagnostics manager
//!
//! Drives add/cancel, scheduling ticks and inbound frames against a mock
//! controller and a hand-driven clock:
//! 1. Slot accounting and list membership
//! 2. Scheduling: conflicts, timeouts, round robin
//! 3. Response relay for targeted and functional requests
//! 4. Control commands

use std::sync::Arc;

use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use vi_core::OutgoingFrame;

use vi_diag::{
    BusConfig, CanBusSet, CanMessage, ControlCommand, DiagResult, DiagnosticError,
    DiagnosticRequest, DiagnosticResponseRecord, DiagnosticsConfig, DiagnosticsManager, ManualClock,
    MessageBuffer, MockController, RequestOptions, SimpleMessage, VehicleMessage,
};

// =============================================================================
// Test bench
// =============================================================================

struct Bench {
    manager: DiagnosticsManager,
    buses: CanBusSet,
    controller: MockController,
    clock: ManualClock,
    pipeline: MessageBuffer,
}

impl Bench {
    fn new() -> Self {
        Self::with_config(DiagnosticsConfig::default().with_bus(BusConfig::new(1).raw_writable(true)))
    }

    fn with_config(config: DiagnosticsConfig) -> Self {
        let controller = MockController::new();
        let shared = controller.clone();
        let buses = config.build_buses(move |_| Box::new(shared.clone()));
        let clock = ManualClock::starting_at(1_000);
        let manager = DiagnosticsManager::new(&config, Arc::new(clock.clone()));
        Self {
            manager,
            buses,
            controller,
            clock,
            pipeline: MessageBuffer::new(),
        }
    }

    fn add(&mut self, request: DiagnosticRequest, options: RequestOptions) -> DiagResult<()> {
        self.manager.add_request(&mut self.buses, 1, request, options)
    }

    /// One scheduling tick on bus 1, returning the frames that went out
    fn tick(&mut self) -> Vec<OutgoingFrame> {
        self.manager.send_requests(&mut self.buses, 1);
        if let Some(bus) = self.buses.lookup_mut(1) {
            bus.process_write_queue();
        }
        self.controller.take_sent()
    }

    fn receive(&mut self, id: u32, bytes: &[u8]) {
        self.manager.receive_can_message(
            &mut self.buses,
            1,
            &CanMessage::from_bytes(id, bytes),
            &mut self.pipeline,
        );
    }

    fn in_flight(&self, arbitration_id: u32) -> usize {
        self.manager
            .pool()
            .iter_active()
            .filter(|(_, active)| active.in_flight && active.request().arbitration_id == arbitration_id)
            .count()
    }

    fn recurring_pids(&self) -> Vec<Option<u16>> {
        let pool = self.manager.pool();
        pool.recurring_ids()
            .into_iter()
            .filter_map(|id| pool.get(id).map(|active| active.request().pid))
            .collect()
    }
}

fn obd2(arbitration_id: u32, pid: u16) -> DiagnosticRequest {
    DiagnosticRequest::new(arbitration_id, 0x01).with_pid(pid)
}

fn payloads(frames: &[OutgoingFrame]) -> Vec<Vec<u8>> {
    frames.iter().map(|frame| frame.payload().to_vec()).collect()
}

// =============================================================================
// Slot accounting
// =============================================================================

#[test]
fn test_every_slot_on_exactly_one_list() {
    let mut bench = Bench::with_config(
        DiagnosticsConfig::default()
            .with_max_simultaneous_requests(6)
            .with_bus(BusConfig::new(1).raw_writable(true)),
    );

    for step in 0..30u16 {
        let pid = step % 5;
        let request = obd2(0x7E0 + (step as u32 % 3), pid);
        match step % 4 {
            0 | 1 => {
                let _ = bench.add(request, RequestOptions::new().with_frequency(2.0));
            }
            2 => {
                let _ = bench.add(request, RequestOptions::new());
            }
            _ => {
                bench.manager.cancel_recurring_request(&mut bench.buses, 1, &request);
            }
        }

        let pool = bench.manager.pool();
        assert!(pool.check_invariants(), "membership broken after step {}", step);
        assert_eq!(
            pool.free_count() + pool.nonrecurring_count() + pool.recurring_count(),
            6
        );
    }
}

#[test]
fn test_recurring_update_reuses_slot() {
    let mut bench = Bench::new();
    let request = obd2(0x7E0, 0x0C);

    bench
        .add(request.clone(), RequestOptions::new().with_frequency(1.0))
        .unwrap();
    let free = bench.manager.pool().free_count();

    bench
        .add(request, RequestOptions::new().with_frequency(5.0).named("engine_speed"))
        .unwrap();

    let pool = bench.manager.pool();
    assert_eq!(pool.free_count(), free);
    assert_eq!(pool.recurring_count(), 1);
    assert_eq!(bench.controller.install_count(0x7E8), 1);

    let (_, active) = pool.iter_active().next().unwrap();
    assert_eq!(active.generic_name(), Some("engine_speed"));
    assert_eq!(active.frequency_clock.frequency_hz, 5.0);
}

#[test]
fn test_pool_exhaustion() {
    let mut bench = Bench::new();

    for i in 0..20 {
        bench.add(obd2(0x700 + i, 0x0C), RequestOptions::new()).unwrap();
    }
    let err = bench.add(obd2(0x720, 0x0C), RequestOptions::new()).unwrap_err();

    assert_eq!(err, DiagnosticError::PoolExhausted { capacity: 20 });
    assert_eq!(bench.manager.pool().nonrecurring_count(), 20);
    assert_eq!(bench.manager.pool().free_count(), 0);
    assert_eq!(bench.controller.installed_filters().len(), 20);
    assert_eq!(bench.controller.install_count(0x728), 0);
}

#[test]
fn test_frequency_above_cap_installs_nothing() {
    let mut bench = Bench::new();
    let err = bench
        .add(obd2(0x7E0, 0x0C), RequestOptions::new().with_frequency(20.0))
        .unwrap_err();

    assert!(matches!(err, DiagnosticError::FrequencyTooHigh { .. }));
    assert!(bench.controller.installed_filters().is_empty());
    assert_eq!(bench.manager.pool().free_count(), 20);
}

#[test]
fn test_broadcast_filter_failure_rolls_back() {
    let mut bench = Bench::new();
    bench.controller.reject_filter(0x7EC);

    let err = bench
        .add(obd2(0x7DF, 0x0C), RequestOptions::new().wait_for_multiple_responses(true))
        .unwrap_err();

    assert_eq!(err, DiagnosticError::FilterInstallFailed { bus: 1, id: 0x7EC });
    assert!(bench.controller.installed_filters().is_empty());
    for id in 0x7E8..0x7EC {
        assert_eq!(bench.controller.uninstall_count(id), 1);
    }
    assert_eq!(bench.manager.pool().free_count(), 20);
}

#[test]
fn test_negative_or_nan_frequency_never_schedules() {
    let mut bench = Bench::new();

    for frequency in [-5.0, f64::NAN] {
        let err = bench
            .add(obd2(0x7E0, 0x0C), RequestOptions::new().with_frequency(frequency))
            .unwrap_err();
        assert!(matches!(err, DiagnosticError::InvalidFrequency(_)));
    }

    assert_eq!(bench.manager.pool().free_count(), 20);
    assert!(bench.controller.installed_filters().is_empty());
    for _ in 0..5 {
        assert!(bench.tick().is_empty());
    }
}

#[test]
fn test_arbitration_id_out_of_range_installs_nothing() {
    let mut bench = Bench::new();

    let err = bench
        .add(DiagnosticRequest::new(u32::MAX, 0x01), RequestOptions::new())
        .unwrap_err();

    assert_eq!(err, DiagnosticError::InvalidArbitrationId(u32::MAX));
    assert_eq!(bench.manager.pool().free_count(), 20);
    assert!(bench.controller.installed_filters().is_empty());
}

// =============================================================================
// Scheduling
// =============================================================================

#[test]
fn test_one_request_in_flight_per_id() {
    let mut bench = Bench::new();
    bench.add(obd2(0x7E0, 0x0C), RequestOptions::new()).unwrap();
    bench.add(obd2(0x7E0, 0x0D), RequestOptions::new()).unwrap();

    // Newest one-shot is at the list head
    let sent = bench.tick();
    assert_eq!(payloads(&sent), vec![vec![0x02, 0x01, 0x0D]]);
    assert_eq!(bench.in_flight(0x7E0), 1);

    // Still waiting: nothing new goes out
    assert!(bench.tick().is_empty());

    bench.receive(0x7E8, &[0x03, 0x41, 0x0D, 0x40]);
    assert_eq!(bench.in_flight(0x7E0), 0);
    assert_eq!(bench.manager.pool().nonrecurring_count(), 1);

    let sent = bench.tick();
    assert_eq!(payloads(&sent), vec![vec![0x02, 0x01, 0x0C]]);
    assert_eq!(bench.in_flight(0x7E0), 1);
}

#[test]
fn test_different_ids_go_out_together() {
    let mut bench = Bench::new();
    bench.add(obd2(0x7E0, 0x0C), RequestOptions::new()).unwrap();
    bench.add(obd2(0x7E1, 0x0C), RequestOptions::new()).unwrap();

    let sent = bench.tick();
    assert_eq!(sent.len(), 2);
    assert_eq!(bench.in_flight(0x7E0), 1);
    assert_eq!(bench.in_flight(0x7E1), 1);
}

#[test]
fn test_timeout_frees_slot_and_filters_once() {
    let mut bench = Bench::new();
    bench.add(obd2(0x7E0, 0x0C), RequestOptions::new()).unwrap();
    assert_eq!(bench.tick().len(), 1);

    bench.clock.advance(99);
    assert!(bench.tick().is_empty());
    assert_eq!(bench.in_flight(0x7E0), 1);
    assert_eq!(bench.controller.uninstall_count(0x7E8), 0);

    bench.clock.advance(1);
    assert!(bench.tick().is_empty());
    assert_eq!(bench.manager.pool().free_count(), 20);
    assert_eq!(bench.controller.uninstall_count(0x7E8), 1);

    bench.clock.advance(500);
    bench.tick();
    assert_eq!(bench.controller.uninstall_count(0x7E8), 1);
    assert!(bench.pipeline.is_empty());
}

#[test]
fn test_recurring_round_robin() {
    let mut bench = Bench::new();
    bench
        .add(obd2(0x7E0, 0x0A), RequestOptions::new().with_frequency(5.0))
        .unwrap();
    bench
        .add(obd2(0x7E0, 0x0B), RequestOptions::new().with_frequency(5.0))
        .unwrap();
    assert_eq!(bench.recurring_pids(), vec![Some(0x0B), Some(0x0A)]);

    // First look at each staggered clock lands inside its first period
    assert!(bench.tick().is_empty());
    bench.clock.advance(200);

    let sent = bench.tick();
    assert_eq!(payloads(&sent), vec![vec![0x02, 0x01, 0x0B]]);

    bench.receive(0x7E8, &[0x03, 0x41, 0x0B, 0x01]);
    assert_eq!(bench.recurring_pids(), vec![Some(0x0A), Some(0x0B)]);

    let sent = bench.tick();
    assert_eq!(payloads(&sent), vec![vec![0x02, 0x01, 0x0A]]);
    assert_eq!(bench.manager.pool().recurring_count(), 2);
}

#[test]
fn test_recurring_waits_for_its_period() {
    let mut bench = Bench::new();
    bench
        .add(obd2(0x7E0, 0x0C), RequestOptions::new().with_frequency(2.0))
        .unwrap();

    bench.tick();
    bench.clock.advance(500);
    assert_eq!(bench.tick().len(), 1);

    bench.receive(0x7E8, &[0x04, 0x41, 0x0C, 0x1A, 0xF8]);
    bench.clock.advance(250);
    assert!(bench.tick().is_empty());

    bench.clock.advance(250);
    assert_eq!(bench.tick().len(), 1);
}

#[test]
fn test_full_write_queue_retries_next_tick() {
    let mut bench = Bench::with_config(
        DiagnosticsConfig::default().with_bus(
            BusConfig::new(1)
                .raw_writable(true)
                .with_write_queue_capacity(1),
        ),
    );
    bench.add(obd2(0x7E0, 0x0C), RequestOptions::new()).unwrap();
    bench.add(obd2(0x7E1, 0x0C), RequestOptions::new()).unwrap();

    let sent = bench.tick();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].id, 0x7E1);
    assert_eq!(bench.in_flight(0x7E0), 0);

    let sent = bench.tick();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].id, 0x7E0);
}

// =============================================================================
// Response relay
// =============================================================================

#[test]
fn test_named_response_relayed_and_slot_freed() {
    let mut bench = Bench::new();
    bench
        .add(
            obd2(0x7E0, 0x0C),
            RequestOptions::new().named("engine_speed").with_scale(0.25, 0.0),
        )
        .unwrap();
    bench.tick();

    bench.receive(0x7E8, &[0x04, 0x41, 0x0C, 0x1A, 0xF8]);

    assert_eq!(
        bench.pipeline.drain(),
        vec![VehicleMessage::Simple(SimpleMessage {
            name: "engine_speed".into(),
            value: 1726.0,
        })]
    );
    assert_eq!(bench.manager.pool().free_count(), 20);
    assert_eq!(bench.controller.uninstall_count(0x7E8), 1);
}

#[test]
fn test_targeted_record_uses_request_id() {
    let mut bench = Bench::new();
    bench.add(obd2(0x7E0, 0x0D), RequestOptions::new()).unwrap();
    bench.tick();

    bench.receive(0x7E8, &[0x03, 0x41, 0x0D, 0x32]);

    assert_eq!(
        bench.pipeline.drain(),
        vec![VehicleMessage::DiagnosticResponse(DiagnosticResponseRecord {
            bus: 1,
            message_id: 0x7E0,
            mode: 0x01,
            pid: Some(0x0D),
            success: true,
            negative_response_code: None,
            payload: Some(vec![0x32]),
            value: None,
        })]
    );
}

#[test]
fn test_functional_records_keep_responder_ids() {
    let mut bench = Bench::new();
    bench
        .add(
            obd2(0x7DF, 0x0D),
            RequestOptions::new()
                .wait_for_multiple_responses(true)
                .parse_payload(true),
        )
        .unwrap();
    assert_eq!(payloads(&bench.tick()), vec![vec![0x02, 0x01, 0x0D]]);

    bench.receive(0x7E8, &[0x03, 0x41, 0x0D, 0x32]);
    bench.receive(0x7EA, &[0x03, 0x41, 0x0D, 0x33]);

    // Still collecting answers until the window closes
    assert_eq!(bench.in_flight(0x7DF), 1);

    let ids: Vec<(u32, Option<f64>)> = bench
        .pipeline
        .drain()
        .into_iter()
        .filter_map(|message| match message {
            VehicleMessage::DiagnosticResponse(record) => Some((record.message_id, record.value)),
            VehicleMessage::Simple(_) => None,
        })
        .collect();
    assert_eq!(ids, vec![(0x7E8, Some(50.0)), (0x7EA, Some(51.0))]);

    bench.clock.advance(100);
    bench.tick();
    assert_eq!(bench.manager.pool().free_count(), 20);
    for id in 0x7E8..=0x7EF {
        assert_eq!(bench.controller.uninstall_count(id), 1);
    }
}

#[test]
fn test_multi_frame_response() {
    let mut bench = Bench::new();
    bench
        .add(DiagnosticRequest::new(0x7E0, 0x09).with_pid(0x02), RequestOptions::new())
        .unwrap();
    bench.tick();

    bench.receive(0x7E8, &[0x10, 0x14, 0x49, 0x02, 0x01, b'1', b'G', b'1']);
    let flow_control = bench.tick();
    assert_eq!(flow_control.len(), 1);
    assert_eq!(flow_control[0].id, 0x7E0);
    assert_eq!(flow_control[0].data[0], 0x30);

    bench.receive(0x7E8, &[0x21, b'J', b'C', b'5', b'4', b'4', b'4', b'R']);
    bench.receive(0x7E8, &[0x22, b'7', b'2', b'5', b'2', b'3', b'6', b'7']);

    let messages = bench.pipeline.drain();
    let VehicleMessage::DiagnosticResponse(record) = &messages[0] else {
        panic!("expected a diagnostic response record");
    };
    let mut vin = vec![0x01];
    vin.extend_from_slice(b"1G1JC5444R7252367");
    assert_eq!(record.payload, Some(vin));
}

#[test]
fn test_negative_response_is_relayed_as_record() {
    let mut bench = Bench::new();
    bench
        .add(
            DiagnosticRequest::new(0x7E0, 0x22).with_pid(0xF190),
            RequestOptions::new().named("vin"),
        )
        .unwrap();
    bench.tick();

    bench.receive(0x7E8, &[0x03, 0x7F, 0x22, 0x78]);
    assert!(bench.pipeline.is_empty());

    bench.receive(0x7E8, &[0x03, 0x7F, 0x22, 0x31]);
    let messages = bench.pipeline.drain();
    let VehicleMessage::DiagnosticResponse(record) = &messages[0] else {
        panic!("expected a diagnostic response record");
    };
    assert!(!record.success);
    assert_eq!(record.negative_response_code, Some(0x31));
    assert_eq!(bench.manager.pool().free_count(), 20);
}

#[test]
fn test_protocol_failure_is_not_relayed() {
    let mut bench = Bench::new();
    bench
        .add(DiagnosticRequest::new(0x7E0, 0x09).with_pid(0x02), RequestOptions::new())
        .unwrap();
    bench.tick();

    bench.receive(0x7E8, &[0x10, 0x14, 0x49, 0x02, 0x01, b'1', b'G', b'1']);
    bench.receive(0x7E8, &[0x23, b'J', b'C', b'5', b'4', b'4', b'4', b'R']);

    assert!(bench.pipeline.is_empty());
    assert_eq!(bench.manager.pool().free_count(), 20);
}

#[test]
fn test_cancelled_request_drops_late_response() {
    let mut bench = Bench::new();
    let request = obd2(0x7E0, 0x0C);
    bench
        .add(request.clone(), RequestOptions::new().with_frequency(10.0))
        .unwrap();
    bench.tick();
    bench.clock.advance(100);
    assert_eq!(bench.tick().len(), 1);

    assert!(bench.manager.cancel_recurring_request(&mut bench.buses, 1, &request));
    assert_eq!(bench.controller.uninstall_count(0x7E8), 1);

    bench.receive(0x7E8, &[0x04, 0x41, 0x0C, 0x1A, 0xF8]);
    assert!(bench.pipeline.is_empty());
}

#[test]
fn test_callback_sees_each_response() {
    let mut bench = Bench::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    bench
        .add(
            obd2(0x7E0, 0x05),
            RequestOptions::new()
                .named("engine_coolant_temperature")
                .with_scale(1.0, -40.0)
                .with_callback(move |active, response, value| {
                    sink.lock().push((active.request().pid, response.arbitration_id, value));
                }),
        )
        .unwrap();
    bench.tick();

    bench.receive(0x7E8, &[0x03, 0x41, 0x05, 0x84]);
    assert_eq!(*seen.lock(), vec![(Some(0x05), 0x7E8, 92.0)]);
}

// =============================================================================
// Control commands
// =============================================================================

fn command_bench() -> Bench {
    Bench::with_config(
        DiagnosticsConfig::default()
            .with_bus(BusConfig::new(1).raw_writable(true))
            .with_bus(BusConfig::new(2)),
    )
}

fn run(bench: &mut Bench, json: &str) -> DiagResult<()> {
    let command = ControlCommand::from_json(json)?;
    bench.manager.handle_control_command(&mut bench.buses, &command)
}

#[test]
fn test_command_defaults_to_first_bus() {
    let mut bench = command_bench();
    run(
        &mut bench,
        r#"{"command": "diagnostic_request", "request": {"id": 2016, "mode": 1, "pid": 12}}"#,
    )
    .unwrap();

    let (_, active) = bench.manager.pool().iter_active().next().unwrap();
    assert_eq!(active.bus, 1);
    assert!(!active.recurring);
    assert!(!active.wait_for_multiple_responses);
    assert_eq!(active.factor, 1.0);
}

#[test]
fn test_command_broadcast_waits_for_multiple_responses() {
    let mut bench = command_bench();
    run(
        &mut bench,
        r#"{"command": "diagnostic_request",
            "request": {"bus": 1, "id": 2015, "mode": 1, "pid": 12, "frequency": 1, "name": "rpm"}}"#,
    )
    .unwrap();

    let (_, active) = bench.manager.pool().iter_active().next().unwrap();
    assert!(active.wait_for_multiple_responses);
    assert!(active.recurring);
    assert_eq!(active.generic_name(), Some("rpm"));
    assert_eq!(bench.controller.installed_filters().len(), 8);
}

#[test]
fn test_command_rejections() {
    let mut bench = command_bench();

    assert_eq!(
        run(&mut bench, r#"{"command": "diagnostic_request", "request": {"bus": 2, "id": 2016, "mode": 1}}"#),
        Err(DiagnosticError::RawWriteDisallowed(2))
    );
    assert_eq!(
        run(&mut bench, r#"{"command": "diagnostic_request", "request": {"bus": 3, "id": 2016, "mode": 1}}"#),
        Err(DiagnosticError::UnknownBus(3))
    );
    assert_eq!(
        run(&mut bench, r#"{"command": "diagnostic_request", "request": {"id": 2016}}"#),
        Err(DiagnosticError::MissingField("mode"))
    );
    assert_eq!(
        run(&mut bench, r#"{"command": "device_id"}"#),
        Err(DiagnosticError::NotADiagnosticRequest)
    );
    assert!(matches!(
        run(&mut bench, r#"{"command": "diagnostic_request", "request": {"id": 2016, "mode": 34, "payload": "zz"}}"#),
        Err(DiagnosticError::InvalidPayload(_))
    ));
    assert_eq!(bench.manager.pool().free_count(), 20);
}

#[test]
fn test_command_without_buses() {
    let mut bench = Bench::with_config(DiagnosticsConfig::default());
    assert_eq!(
        run(&mut bench, r#"{"command": "diagnostic_request", "request": {"id": 2016, "mode": 1}}"#),
        Err(DiagnosticError::NoActiveBus)
    );
}

#[test]
fn test_command_payload_reaches_the_bus() {
    let mut bench = command_bench();
    run(
        &mut bench,
        r#"{"command": "diagnostic_request",
            "request": {"id": 2016, "mode": 34, "pid": 61840, "payload": "0x01"}}"#,
    )
    .unwrap();

    let sent = bench.tick();
    assert_eq!(payloads(&sent), vec![vec![0x04, 0x22, 0xF1, 0x90, 0x01]]);
}

#[test]
fn test_command_rejects_out_of_range_values() {
    let mut bench = command_bench();

    assert_eq!(
        run(&mut bench, r#"{"command": "diagnostic_request", "request": {"id": 4294967295, "mode": 1}}"#),
        Err(DiagnosticError::InvalidArbitrationId(u32::MAX))
    );
    assert_eq!(
        run(
            &mut bench,
            r#"{"command": "diagnostic_request", "request": {"id": 2016, "mode": 1, "pid": 12, "frequency": -5.0}}"#
        ),
        Err(DiagnosticError::InvalidFrequency(-5.0))
    );
    assert_eq!(bench.manager.pool().free_count(), 20);
    assert!(bench.controller.installed_filters().is_empty());
}
