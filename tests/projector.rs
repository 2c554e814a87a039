//! Session behaviour against a scripted in-memory transport.
//!
//! The mock records every packet sent and answers with queued frames, so each
//! test can assert on the exact bytes that would have gone to the device.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use lightcrafter::{
    cmd, DisplayMode, DisplaySetting, ErrorCode, PatternSequenceSettings, Projector,
    ProjectorError, RevisionTarget, TestPattern, Transport, TransportError,
};
use lightcrafter_transport::{build_packet, verify_checksum, PacketHeader, PacketType};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[derive(Default)]
struct Script {
    sent: Vec<Vec<u8>>,
    responses: VecDeque<Vec<u8>>,
    closed: bool,
}

/// Transport double; clones share state so the test keeps a handle
#[derive(Clone, Default)]
struct MockTransport {
    script: Arc<Mutex<Script>>,
}

impl MockTransport {
    fn respond(&self, frame: Vec<u8>) -> &Self {
        self.script.lock().unwrap().responses.push_back(frame);
        self
    }

    fn sent(&self) -> Vec<Vec<u8>> {
        self.script.lock().unwrap().sent.clone()
    }

    fn closed(&self) -> bool {
        self.script.lock().unwrap().closed
    }
}

impl Transport for MockTransport {
    fn send_packet(&mut self, packet: &[u8]) -> Result<(), TransportError> {
        self.script.lock().unwrap().sent.push(packet.to_vec());
        Ok(())
    }

    fn read_frame(&mut self) -> Result<Vec<u8>, TransportError> {
        self.script
            .lock()
            .unwrap()
            .responses
            .pop_front()
            .ok_or(TransportError::Timeout)
    }

    fn close(&mut self) -> Result<(), TransportError> {
        self.script.lock().unwrap().closed = true;
        Ok(())
    }
}

fn frame(packet_type: PacketType, command: u16, payload: &[u8]) -> Vec<u8> {
    let header = PacketHeader::new(packet_type, command).with_length(payload.len() as u16);
    build_packet(&header.to_bytes(), payload)
}

fn write_ok(command: u16) -> Vec<u8> {
    frame(PacketType::WriteResponse, command, &[])
}

fn read_ok(command: u16, payload: &[u8]) -> Vec<u8> {
    frame(PacketType::ReadResponse, command, payload)
}

fn busy(command: u16) -> Vec<u8> {
    frame(PacketType::Busy, command, &[])
}

fn device_error(command: u16, code: u8) -> Vec<u8> {
    frame(PacketType::Error, command, &[code])
}

fn session() -> (MockTransport, Projector<MockTransport>) {
    init_tracing();
    let mock = MockTransport::default();
    (mock.clone(), Projector::new(mock))
}

#[test]
fn get_display_mode_sends_documented_bytes() {
    let (mock, mut projector) = session();
    mock.respond(read_ok(cmd::DISPLAY_MODE, &[0x00]));

    assert_eq!(projector.current_mode(), None);
    assert_eq!(projector.get_display_mode().unwrap(), DisplayMode::StaticImage);
    assert_eq!(projector.current_mode(), Some(DisplayMode::StaticImage));
    assert_eq!(mock.sent(), [vec![0x04, 0x01, 0x01, 0x00, 0x00, 0x00, 0x06]]);
}

#[test]
fn get_revision_decodes_text() {
    let (mock, mut projector) = session();
    mock.respond(read_ok(cmd::VERSION, b"5.0.0\0\0\0"));

    let revision = projector.get_revision(RevisionTarget::Dm365Software).unwrap();
    assert_eq!(revision, "5.0.0");
    assert_eq!(mock.sent(), [vec![0x04, 0x01, 0x00, 0x00, 0x01, 0x00, 0x00, 0x06]]);
}

#[test]
fn static_image_is_mode_switch_then_three_fragments() {
    let (mock, mut projector) = session();
    mock.respond(write_ok(cmd::DISPLAY_MODE))
        .respond(write_ok(cmd::STATIC_IMAGE))
        .respond(write_ok(cmd::STATIC_IMAGE))
        .respond(write_ok(cmd::STATIC_IMAGE));

    let image: Vec<u8> = (0..1500u32).map(|i| (i * 7 % 251) as u8).collect();
    projector.display_static_image(&image).unwrap();
    assert_eq!(projector.current_mode(), Some(DisplayMode::StaticImage));

    let sent = mock.sent();
    assert_eq!(sent.len(), 4);
    assert_eq!(sent[0], [0x02, 0x01, 0x01, 0x00, 0x01, 0x00, 0x00, 0x05]);

    let expected = [(0x01, 512usize), (0x02, 512), (0x03, 476)];
    let mut reassembled = Vec::new();
    for (packet, (flag, len)) in sent[1..].iter().zip(expected) {
        assert_eq!(&packet[..3], &[0x02, 0x01, 0x05]);
        assert_eq!(packet[3], flag);
        assert_eq!(u16::from_le_bytes([packet[4], packet[5]]) as usize, len);
        assert_eq!(packet.len(), 6 + len + 1);
        assert!(verify_checksum(packet));
        reassembled.extend_from_slice(&packet[6..packet.len() - 1]);
    }
    assert_eq!(reassembled, image);
}

#[test]
fn small_image_uses_single_frame() {
    let (mock, mut projector) = session();
    mock.respond(write_ok(cmd::DISPLAY_MODE))
        .respond(write_ok(cmd::STATIC_IMAGE));

    projector.display_static_image(&[1, 2, 3]).unwrap();
    let sent = mock.sent();
    assert_eq!(sent[1], [0x02, 0x01, 0x05, 0x00, 0x03, 0x00, 1, 2, 3, 0x11]);
}

#[test]
fn busy_mid_transfer_stops_sending() {
    let (mock, mut projector) = session();
    mock.respond(write_ok(cmd::DISPLAY_MODE))
        .respond(write_ok(cmd::STATIC_IMAGE))
        .respond(busy(cmd::STATIC_IMAGE))
        .respond(write_ok(cmd::STATIC_IMAGE));

    let err = projector.display_static_image(&[0x55; 1500]).unwrap_err();
    assert!(err.is_busy(), "got {err:?}");
    // mode switch + first two fragments; the last fragment is never sent
    assert_eq!(mock.sent().len(), 3);
}

#[test]
fn empty_image_is_rejected_before_sending() {
    let (mock, mut projector) = session();
    let err = projector.display_static_image(&[]).unwrap_err();
    assert!(matches!(err, ProjectorError::InvalidParameter(_)));
    let err = projector.define_pattern(0, &[]).unwrap_err();
    assert!(matches!(err, ProjectorError::InvalidParameter(_)));
    assert!(mock.sent().is_empty());
}

#[test]
fn test_pattern_14_is_rejected_before_sending() {
    let (mock, mut projector) = session();
    let err = projector.display_internal_test_pattern(14).unwrap_err();
    assert!(matches!(err, ProjectorError::InvalidParameter(_)));
    assert!(mock.sent().is_empty());
}

#[test]
fn test_pattern_13_switches_mode_then_selects() {
    let (mock, mut projector) = session();
    mock.respond(write_ok(cmd::DISPLAY_MODE))
        .respond(write_ok(cmd::TEST_PATTERN));

    projector.display_internal_test_pattern(13).unwrap();
    assert_eq!(
        mock.sent(),
        [
            vec![0x02, 0x01, 0x01, 0x00, 0x01, 0x00, 0x01, 0x06],
            vec![0x02, 0x01, 0x03, 0x00, 0x01, 0x00, 0x0D, 0x14],
        ]
    );
    assert_eq!(projector.current_mode(), Some(DisplayMode::InternalTestPattern));
}

#[test]
fn device_error_carries_decoded_reason() {
    let (mock, mut projector) = session();
    mock.respond(write_ok(cmd::DISPLAY_MODE))
        .respond(vec![0x01, 0x01, 0x03, 0x00, 0x01, 0x00, 0x03]);

    let err = projector
        .show_test_pattern(TestPattern::SolidWhite)
        .unwrap_err();
    match &err {
        ProjectorError::Device { command, code } => {
            assert_eq!(*command, cmd::TEST_PATTERN);
            assert_eq!(*code, ErrorCode::InvalidParameter);
        }
        other => panic!("expected device error, got {other:?}"),
    }
    assert!(err.to_string().contains("Invalid Parameter"));
}

#[test]
fn failed_mode_switch_forgets_mode() {
    let (mock, mut projector) = session();
    mock.respond(write_ok(cmd::DISPLAY_MODE))
        .respond(device_error(cmd::DISPLAY_MODE, 5));

    projector.set_mode_to_pattern_sequence().unwrap();
    assert_eq!(projector.current_mode(), Some(DisplayMode::PatternSequence));

    let err = projector.set_mode_to_static_image().unwrap_err();
    assert_eq!(err.device_code(), Some(ErrorCode::HardwareFailure));
    assert_eq!(projector.current_mode(), None);
}

#[test]
fn display_setting_round_trip() {
    let (mock, mut projector) = session();
    mock.respond(write_ok(cmd::DISPLAY_SETTING))
        .respond(read_ok(cmd::DISPLAY_SETTING, &[0, 1, 1]));

    projector
        .set_display_setting(DisplaySetting::new(true, true, false))
        .unwrap();
    let setting = projector.get_display_setting().unwrap();
    assert_eq!(setting, DisplaySetting::new(false, true, true));

    let sent = mock.sent();
    assert_eq!(sent[0], [0x02, 0x01, 0x07, 0x00, 0x03, 0x00, 0x01, 0x01, 0x00, 0x0F]);
    assert_eq!(sent[1], [0x04, 0x01, 0x07, 0x00, 0x00, 0x00, 0x0C]);
}

#[test]
fn malformed_display_setting_is_a_protocol_error() {
    let (mock, mut projector) = session();
    mock.respond(read_ok(cmd::DISPLAY_SETTING, &[0, 2, 1]));
    let err = projector.get_display_setting().unwrap_err();
    assert!(matches!(err, ProjectorError::Protocol(_)), "got {err:?}");
}

#[test]
fn pattern_sequence_settings_payload() {
    let (mock, mut projector) = session();
    mock.respond(write_ok(cmd::PATTERN_SEQ_SETTING));

    projector
        .set_pattern_sequence_settings(&PatternSequenceSettings::default())
        .unwrap();
    let sent = mock.sent();
    assert_eq!(&sent[0][..6], &[0x02, 0x04, 0x00, 0x00, 0x11, 0x00]);
    assert_eq!(
        &sent[0][6..23],
        &[8, 2, 0, 1, 0, 0, 0, 0, 0xD6, 0xDC, 0x32, 0x00, 0xD6, 0xDC, 0x32, 0x00, 1]
    );
    assert!(verify_checksum(&sent[0]));
}

#[test]
fn invalid_pattern_sequence_settings_send_nothing() {
    let (mock, mut projector) = session();
    let settings = PatternSequenceSettings::new().bit_depth(0);
    let err = projector.set_pattern_sequence_settings(&settings).unwrap_err();
    assert!(matches!(err, ProjectorError::InvalidParameter(_)));

    let err = projector.display_pattern(0).unwrap_err();
    assert!(matches!(err, ProjectorError::InvalidParameter(_)));
    assert!(mock.sent().is_empty());
}

#[test]
fn define_pattern_prefixes_slot_index() {
    let (mock, mut projector) = session();
    mock.respond(write_ok(cmd::DISPLAY_MODE))
        .respond(write_ok(cmd::PATTERN_DEFINITION))
        .respond(write_ok(cmd::PATTERN_DEFINITION));

    projector.define_pattern(1, &[0xEE; 600]).unwrap();
    let sent = mock.sent();
    assert_eq!(sent.len(), 3);
    assert_eq!(sent[0], [0x02, 0x01, 0x01, 0x00, 0x01, 0x00, 0x04, 0x09]);
    assert_eq!(&sent[1][..7], &[0x02, 0x04, 0x01, 0x01, 0x00, 0x02, 0x01]);
    assert_eq!(&sent[2][..6], &[0x02, 0x04, 0x01, 0x03, 0x59, 0x00]);
}

#[test]
fn sequence_start_stop_and_display() {
    let (mock, mut projector) = session();
    mock.respond(write_ok(cmd::PATTERN_SEQ_START))
        .respond(write_ok(cmd::PATTERN_DISPLAY))
        .respond(write_ok(cmd::PATTERN_SEQ_START));

    projector.start_pattern_sequence().unwrap();
    projector.display_pattern(1500).unwrap();
    projector.stop_pattern_sequence().unwrap();

    let sent = mock.sent();
    assert_eq!(sent[0], [0x02, 0x04, 0x02, 0x00, 0x01, 0x00, 0x01, 0x0A]);
    assert_eq!(&sent[1][6..8], &1500u16.to_le_bytes());
    assert_eq!(sent[2], [0x02, 0x04, 0x02, 0x00, 0x01, 0x00, 0x00, 0x09]);
}

#[test]
fn answer_for_other_command_is_unexpected() {
    let (mock, mut projector) = session();
    mock.respond(read_ok(cmd::VERSION, &[0x00]));
    let err = projector.get_display_mode().unwrap_err();
    assert!(matches!(err, ProjectorError::UnexpectedResponse(_)), "got {err:?}");
}

#[test]
fn missing_answer_surfaces_timeout() {
    let (_mock, mut projector) = session();
    let err = projector.get_display_mode().unwrap_err();
    assert!(matches!(
        err,
        ProjectorError::Transport(TransportError::Timeout)
    ));
}

#[test]
fn image_file_is_read_and_sent() {
    let (mock, mut projector) = session();
    mock.respond(write_ok(cmd::DISPLAY_MODE))
        .respond(write_ok(cmd::STATIC_IMAGE));

    let path = std::env::temp_dir().join(format!("lightcrafter-test-{}.bmp", std::process::id()));
    std::fs::write(&path, b"BM\x00\x01").unwrap();
    let result = projector.display_static_image_file(&path);
    std::fs::remove_file(&path).unwrap();
    result.unwrap();
    assert_eq!(&mock.sent()[1][6..10], b"BM\x00\x01");

    let err = projector
        .display_static_image_file("/nonexistent/lightcrafter.bmp")
        .unwrap_err();
    assert!(matches!(err, ProjectorError::Io { .. }));
}

#[test]
fn smaller_chunks_and_close() {
    init_tracing();
    let mock = MockTransport::default();
    let mut projector = Projector::new(mock.clone()).with_chunk_size(100).unwrap();
    assert_eq!(projector.chunk_size(), 100);
    mock.respond(write_ok(cmd::DISPLAY_MODE));
    for _ in 0..3 {
        mock.respond(write_ok(cmd::STATIC_IMAGE));
    }
    projector.display_static_image(&[7; 250]).unwrap();
    let flags: Vec<u8> = mock.sent()[1..].iter().map(|p| p[3]).collect();
    assert_eq!(flags, [1, 2, 3]);

    projector.close().unwrap();
    assert!(mock.closed());

    assert!(Projector::new(MockTransport::default())
        .with_chunk_size(513)
        .is_err());
}
