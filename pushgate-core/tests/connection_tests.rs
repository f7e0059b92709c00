// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Tests for the connection manager

mod common;

use std::sync::Arc;
use std::thread;

use common::{batch, gateway_endpoint, manager, notification, TOKEN};
use pushgate_core::*;

#[test]
fn test_send_opens_and_closes_session() {
    let factory = MockSessionFactory::new();
    let conn = manager(&factory, 3);
    assert_eq!(conn.state(), ConnectionState::Closed);

    conn.send_notification(&notification("{}")).unwrap();

    assert_eq!(factory.handshakes(), 1);
    assert_eq!(factory.closes(), 1);
    assert_eq!(conn.state(), ConnectionState::Closed);
    assert_eq!(factory.endpoints(), vec![gateway_endpoint()]);
}

#[test]
fn test_frames_written_in_order() {
    let factory = MockSessionFactory::new();
    let conn = manager(&factory, 3);
    let notifications = batch(4);

    conn.send_notifications(&notifications).unwrap();

    let expected: Vec<Vec<u8>> = notifications.iter().map(Notification::encode).collect();
    assert_eq!(factory.frames(), expected);
    assert_eq!(factory.handshakes(), 1);
}

#[test]
fn test_empty_batch_writes_nothing_and_closes() {
    let factory = MockSessionFactory::new();
    let conn = manager(&factory, 3);

    conn.send_notifications(&[]).unwrap();

    assert_eq!(factory.write_attempts(), 0);
    assert_eq!(conn.state(), ConnectionState::Closed);
    assert_eq!(factory.live_sessions(), 0);
}

#[test]
fn test_empty_batch_keeps_persistent_session() {
    let factory = MockSessionFactory::new();
    let conn = manager(&factory, 3);
    conn.start_persistence();

    conn.send_notifications(&[]).unwrap();

    assert_eq!(factory.write_attempts(), 0);
    assert_eq!(conn.state(), ConnectionState::PersistentOpen);
    assert_eq!(factory.live_sessions(), 1);
}

#[test]
fn test_persistence_reuses_session() {
    let factory = MockSessionFactory::new();
    let conn = manager(&factory, 3);
    conn.start_persistence();
    assert!(conn.is_persistent());

    conn.send_notification(&notification("{\"a\":1}")).unwrap();
    conn.send_notification(&notification("{\"a\":2}")).unwrap();

    assert_eq!(factory.handshakes(), 1);
    assert_eq!(factory.frames().len(), 2);
    assert_eq!(conn.state(), ConnectionState::PersistentOpen);
}

#[test]
fn test_stop_persistence_closes_and_next_send_reconnects() {
    let factory = MockSessionFactory::new();
    let conn = manager(&factory, 3);
    conn.start_persistence();
    conn.send_notification(&notification("{}")).unwrap();

    conn.stop_persistence();
    assert!(!conn.is_persistent());
    assert_eq!(conn.state(), ConnectionState::Closed);
    assert_eq!(factory.closes(), 1);

    conn.send_notification(&notification("{}")).unwrap();
    assert_eq!(factory.handshakes(), 2);
    assert_eq!(conn.state(), ConnectionState::Closed);
}

#[test]
fn test_stop_persistence_without_session_is_noop() {
    let factory = MockSessionFactory::new();
    let conn = manager(&factory, 3);
    conn.stop_persistence();
    assert_eq!(factory.closes(), 0);
    assert_eq!(conn.state(), ConnectionState::Closed);
}

#[test]
fn test_persistence_from_config() {
    let factory = MockSessionFactory::new();
    let config = GatewayConfig::sandbox().with_persistence();
    let conn = ConnectionManager::from_config(factory.clone(), &config);

    conn.send_notification(&notification("{}")).unwrap();
    assert_eq!(conn.state(), ConnectionState::PersistentOpen);
    assert_eq!(
        factory.endpoints(),
        vec![Endpoint::new("gateway.sandbox.push.apple.com", 2195)]
    );
}

#[test]
fn test_write_failure_retried_until_success() {
    let factory = MockSessionFactory::new();
    let conn = manager(&factory, 3);
    factory.fail_next_writes(2);

    conn.send_notification(&notification("{}")).unwrap();

    assert_eq!(factory.handshakes(), 3);
    assert_eq!(factory.write_attempts(), 3);
    assert_eq!(factory.frames().len(), 1);
    assert_eq!(factory.live_sessions(), 0);
}

#[test]
fn test_retry_limit_exhausted_surfaces_delivery_error() {
    let factory = MockSessionFactory::new();
    let conn = manager(&factory, 3);
    factory.fail_next_writes(3);

    let err = conn.send_notification(&notification("{}")).unwrap_err();

    match err {
        PushError::DeliveryFailed { attempts, last } => {
            assert_eq!(attempts, 3);
            assert!(matches!(*last, PushError::WriteFailed(_)));
        }
        other => panic!("Expected DeliveryFailed, got {:?}", other),
    }
    assert_eq!(factory.handshakes(), 3);
    assert_eq!(factory.write_attempts(), 3);
    assert!(factory.frames().is_empty());
    assert_eq!(conn.state(), ConnectionState::Closed);
    assert_eq!(factory.live_sessions(), 0);
}

#[test]
fn test_manager_usable_after_exhausted_retries() {
    let factory = MockSessionFactory::new();
    let conn = manager(&factory, 2);
    factory.fail_next_writes(2);
    assert!(conn.send_notification(&notification("{}")).is_err());

    conn.send_notification(&notification("{}")).unwrap();
    assert_eq!(factory.frames().len(), 1);
}

#[test]
fn test_mid_batch_failure_resumes_at_failed_frame() {
    let factory = MockSessionFactory::new();
    let conn = manager(&factory, 3);
    let notifications = batch(3);
    // Second write of the batch fails once.
    factory.fail_write_attempt(1);

    conn.send_notifications(&notifications).unwrap();

    let expected: Vec<Vec<u8>> = notifications.iter().map(Notification::encode).collect();
    assert_eq!(factory.frames(), expected);
    assert_eq!(factory.handshakes(), 2);
    assert_eq!(factory.write_attempts(), 4);
}

#[test]
fn test_handshake_failure_retried() {
    let factory = MockSessionFactory::new();
    let conn = manager(&factory, 3);
    factory.fail_next_opens(2);

    conn.send_notification(&notification("{}")).unwrap();

    assert_eq!(factory.open_attempts(), 3);
    assert_eq!(factory.handshakes(), 1);
    assert_eq!(factory.frames().len(), 1);
}

#[test]
fn test_handshake_failures_exhaust_retries() {
    let factory = MockSessionFactory::new();
    let conn = manager(&factory, 2);
    factory.fail_next_opens(5);

    let err = conn.send_notification(&notification("{}")).unwrap_err();

    assert!(matches!(
        err,
        PushError::DeliveryFailed { attempts: 2, ref last } if matches!(**last, PushError::ConnectionFailed(_))
    ));
    assert_eq!(factory.open_attempts(), 2);
}

#[test]
fn test_configuration_error_not_retried() {
    let factory = MockSessionFactory::new();
    let conn = manager(&factory, 3);
    factory.inject_open_error(PushError::Configuration("missing certificate".into()));

    let err = conn.send_notification(&notification("{}")).unwrap_err();

    assert!(matches!(err, PushError::Configuration(_)));
    assert_eq!(factory.open_attempts(), 1);
}

#[test]
fn test_configuration_error_during_reconnect_stops_retrying() {
    let factory = MockSessionFactory::new();
    let conn = manager(&factory, 5);
    factory.inject_open_error(PushError::ConnectionFailed("refused".into()));
    factory.inject_open_error(PushError::Configuration("bad key".into()));

    let err = conn.send_notification(&notification("{}")).unwrap_err();

    assert!(matches!(err, PushError::Configuration(_)));
    assert_eq!(factory.open_attempts(), 2);
    assert_eq!(factory.write_attempts(), 0);
}

#[test]
fn test_concurrent_batches_do_not_interleave() {
    let factory = MockSessionFactory::new();
    let conn = Arc::new(manager(&factory, 3));
    conn.start_persistence();

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let conn = Arc::clone(&conn);
            thread::spawn(move || {
                let notifications: Vec<Notification> = (0..5)
                    .map(|i| {
                        Notification::from_payload(TOKEN, format!("{}:{}", t, i).into_bytes())
                            .unwrap()
                    })
                    .collect();
                conn.send_notifications(&notifications).unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let frames = factory.frames();
    assert_eq!(frames.len(), 40);
    assert_eq!(factory.handshakes(), 1);

    for chunk in frames.chunks(5) {
        let payloads: Vec<String> = chunk
            .iter()
            .map(|frame| String::from_utf8(frame[FRAME_OVERHEAD + 32..].to_vec()).unwrap())
            .collect();
        let thread_id = payloads[0].split(':').next().unwrap().to_string();
        for (i, payload) in payloads.iter().enumerate() {
            assert_eq!(payload, &format!("{}:{}", thread_id, i));
        }
    }
}

#[test]
fn test_concurrent_sends_without_persistence_close_every_session() {
    let factory = MockSessionFactory::new();
    let conn = Arc::new(manager(&factory, 3));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let conn = Arc::clone(&conn);
            thread::spawn(move || conn.send_notifications(&batch(3)).unwrap())
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(factory.handshakes(), 4);
    assert_eq!(factory.live_sessions(), 0);
    assert_eq!(factory.frames().len(), 12);
}

#[test]
fn test_stop_persistence_waits_for_batch_lock() {
    let factory = MockSessionFactory::new();
    let conn = Arc::new(manager(&factory, 3));
    conn.start_persistence();

    let sender = {
        let conn = Arc::clone(&conn);
        thread::spawn(move || {
            for _ in 0..50 {
                conn.send_notifications(&batch(2)).unwrap();
            }
        })
    };
    let stopper = {
        let conn = Arc::clone(&conn);
        thread::spawn(move || {
            for _ in 0..50 {
                conn.stop_persistence();
                conn.start_persistence();
            }
        })
    };
    sender.join().unwrap();
    stopper.join().unwrap();

    // Every batch completed on a live session; no write hit a closed one.
    assert_eq!(factory.frames().len(), 100);
    assert_eq!(factory.write_attempts(), 100);
}

#[test]
fn test_buffered_frames_resent_when_flush_fails() {
    let factory = MockSessionFactory::new();
    let conn = manager(&factory, 3);
    let notifications = batch(2);
    factory.fail_next_flushes(1);

    conn.send_notifications(&notifications).unwrap();

    let expected: Vec<Vec<u8>> = notifications.iter().map(Notification::encode).collect();
    assert_eq!(factory.frames(), expected);
    assert_eq!(factory.handshakes(), 2);
}

#[test]
fn test_final_flush_failure_is_retried() {
    let factory = MockSessionFactory::new();
    let conn = manager(&factory, 2);
    let single = notification("{\"last\":true}");
    factory.fail_next_flushes(1);

    conn.send_notification(&single).unwrap();

    assert_eq!(factory.frames(), vec![single.encode()]);
    assert_eq!(factory.handshakes(), 2);
}

#[test]
fn test_flush_failures_exhaust_retries() {
    let factory = MockSessionFactory::new();
    let conn = manager(&factory, 2);
    factory.fail_next_flushes(2);

    let err = conn.send_notifications(&batch(2)).unwrap_err();

    match err {
        PushError::DeliveryFailed { attempts, last } => {
            assert_eq!(attempts, 2);
            assert!(matches!(*last, PushError::WriteFailed(_)));
        }
        other => panic!("Expected DeliveryFailed, got {:?}", other),
    }
    assert!(factory.frames().is_empty());
    assert_eq!(factory.live_sessions(), 0);
}
