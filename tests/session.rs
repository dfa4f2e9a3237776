//! Attach handshake and session-level caching.

mod util;

use ccdbg::{DebugConfig, DebugStatus, Debugger, Error};
use util::SharedProxy;

#[test]
fn attach_probes_ping_chip_id_and_config() {
    let proxy = SharedProxy::new();
    let dbg = Debugger::attach(proxy.clone()).expect("attach should succeed");

    assert_eq!(dbg.chip_id(), 0x8D41);
    assert_eq!(dbg.debug_config(), DebugConfig::DMA_PAUSE);
    assert_eq!(dbg.debug_status(), DebugStatus::empty());

    // The whole handshake is three zero-padded frames, in this order.
    assert_eq!(
        proxy.state().sent,
        [
            0xF0, 0x00, 0x00, 0x00, // ping
            0x03, 0x00, 0x00, 0x00, // chip id
            0x0B, 0x00, 0x00, 0x00, // read debug config
        ]
    );
}

#[test]
fn attach_refuses_a_foreign_chip() {
    let proxy = SharedProxy::with(|p| p.chip_id = 0x7F00);
    match Debugger::attach(proxy.clone()) {
        Err(Error::UnsupportedChip { id: 0x7F00 }) => {}
        other => panic!("expected unsupported-chip rejection, got {other:?}"),
    }
    // Rejection happens straight after the id probe; the config register is
    // never read.
    assert_eq!(proxy.state().frames.len(), 2);
}

#[test]
fn attach_reports_a_silent_link_as_unreachable() {
    let proxy = SharedProxy::with(|p| p.mute = true);
    assert!(matches!(
        Debugger::attach(proxy),
        Err(Error::ProxyUnreachable)
    ));
}

#[test]
fn write_config_caches_config_and_status() {
    let proxy = SharedProxy::with(|p| p.status = 0x22);
    let mut dbg = Debugger::attach(proxy.clone()).unwrap();

    let status = dbg
        .write_config(DebugConfig::TIMERS_OFF | DebugConfig::TIMER_SUSPEND)
        .unwrap();
    assert_eq!(status.bits(), 0x22);
    assert_eq!(
        dbg.debug_config(),
        DebugConfig::TIMERS_OFF | DebugConfig::TIMER_SUSPEND
    );
    assert_eq!(dbg.debug_status().bits(), 0x22);
    assert_eq!(proxy.state().config, 0x0A, "config byte must reach the proxy");
}

#[test]
fn status_refreshes_the_cached_copy() {
    let proxy = SharedProxy::with(|p| p.status = 0x23);
    let mut dbg = Debugger::attach(proxy).unwrap();

    assert_eq!(dbg.debug_status(), DebugStatus::empty());
    let status = dbg.status().unwrap();
    assert_eq!(status, DebugStatus::CPU_HALTED | DebugStatus::OSCILLATOR_STABLE | DebugStatus::STACK_OVERFLOW);
    assert_eq!(dbg.debug_status(), status);
}

#[test]
fn burst_write_streams_payload_and_caches_status() {
    let proxy = SharedProxy::with(|p| p.status = 0x20);
    let mut dbg = Debugger::attach(proxy.clone()).unwrap();

    let payload: Vec<u8> = (0..64).collect();
    let status = dbg.burst_write(&payload).unwrap();
    assert_eq!(status, DebugStatus::CPU_HALTED);
    assert_eq!(dbg.debug_status(), DebugStatus::CPU_HALTED);

    let state = proxy.state();
    assert_eq!(state.bursts.len(), 1);
    assert_eq!(state.bursts[0], payload);
}

#[test]
fn burst_write_rejects_out_of_bounds_lengths_locally() {
    let proxy = SharedProxy::new();
    let mut dbg = Debugger::attach(proxy.clone()).unwrap();
    proxy.clear_capture();

    assert!(matches!(
        dbg.burst_write(&[]),
        Err(Error::BurstTooLarge { len: 0 })
    ));
    assert!(matches!(
        dbg.burst_write(&vec![0u8; 2049]),
        Err(Error::BurstTooLarge { len: 2049 })
    ));
    assert!(
        proxy.state().sent.is_empty(),
        "rejected bursts must never reach the wire"
    );

    dbg.burst_write(&vec![0u8; 2048])
        .expect("a full 2 KiB burst is within bounds");
    assert_eq!(proxy.state().bursts[0].len(), 2048);
}

#[test]
fn enter_resume_step_and_pc_round_trip() {
    let proxy = SharedProxy::with(|p| p.pc = 0x1234);
    let mut dbg = Debugger::attach(proxy.clone()).unwrap();
    proxy.clear_capture();

    dbg.enter_debug().unwrap();
    assert_eq!(dbg.pc().unwrap(), 0x1234);
    dbg.step().unwrap();
    dbg.resume().unwrap();

    let frames: Vec<u8> = proxy.state().frames.iter().map(|f| f[0]).collect();
    assert_eq!(frames, [0x01, 0x05, 0x06, 0x02]);
}
