//! Station clock read/write through the controller

mod common;

use chrono::{Duration, TimeZone, Utc};
use cm1_comlink::TransportError;
use cm1_registers::DecodeError;
use cm1srv::PollError;
use common::{controller, station};

#[tokio::test]
async fn test_write_then_read_round_trip() {
    let mut controller = controller(station(), 3);
    let instant =
        Utc.with_ymd_and_hms(2025, 3, 14, 15, 9, 26).unwrap() + Duration::milliseconds(535);

    let written = controller.write_clock(instant).await.unwrap();
    let read = controller.read_clock().await.unwrap();

    assert_eq!(read, written);
    assert_eq!(read.instant(), Utc.with_ymd_and_hms(2025, 3, 14, 15, 9, 26).unwrap());
    assert_eq!(controller.transport().register(104), 0x0002);
    assert_eq!(controller.transport().write_count(), 1);
}

#[tokio::test]
async fn test_clock_operations_do_not_retry() {
    let mut station = station();
    station.fail_always(TransportError::timeout("no response"));
    let mut controller = controller(station, 6);

    let err = controller.read_clock().await.unwrap_err();
    assert!(matches!(err, PollError::Transport(TransportError::Timeout(_))));
    assert_eq!(controller.transport().read_count(), 1);

    let err = controller.write_clock(Utc::now()).await.unwrap_err();
    assert!(matches!(err, PollError::Transport(_)));
    assert_eq!(controller.transport().write_count(), 1);
}

#[tokio::test]
async fn test_corrupt_clock_registers() {
    let mut station = station();
    // date 241399: month 13
    station.set_registers(106, &[0x0003, 0xAEF7]);
    let mut controller = controller(station, 3);

    let err = controller.read_clock().await.unwrap_err();
    assert!(matches!(err, PollError::Decode(DecodeError::InvalidClock(_))));
}

#[tokio::test]
async fn test_year_outside_field_range_is_rejected() {
    let mut controller = controller(station(), 3);
    let instant = Utc.with_ymd_and_hms(2100, 1, 1, 0, 0, 0).unwrap();
    let err = controller.write_clock(instant).await.unwrap_err();
    assert!(matches!(err, PollError::Decode(DecodeError::InvalidClock(_))));
    assert_eq!(controller.transport().write_count(), 0);
}
