use super::counters::{
    flush_write_count, reset_flush_counters, set_write_chunk_limit, writable_wait_count,
};
use super::*;
use crate::coords::{Point, PointF};
use crate::protocol::{decode_commands, read_frame, EventKind, Image, EVENT_RECORD_SIZE};
use std::io::Write;
use std::thread;
use std::time::Duration;

fn connected_pair() -> (Channel, UnixStream) {
    let (ours, theirs) = UnixStream::pair().expect("socketpair");
    let mut channel = Channel::new();
    channel.attach(ours, "plotterm-test").unwrap();
    (channel, theirs)
}

/// Keep the kernel buffer far below one large frame so a flush must wait.
fn shrink_send_buffer(channel: &Channel) {
    let fd = channel.raw_fd().expect("connected");
    let size: libc::c_int = 4096;
    // SAFETY: fd is a live socket and `size` outlives the call.
    let rc = unsafe {
        libc::setsockopt(
            fd,
            libc::SOL_SOCKET,
            libc::SO_SNDBUF,
            (&size as *const libc::c_int).cast(),
            std::mem::size_of::<libc::c_int>() as libc::socklen_t,
        )
    };
    assert_eq!(rc, 0, "setsockopt(SO_SNDBUF) failed");
}

fn receive_commands(peer: &mut UnixStream) -> Vec<Command> {
    let payload = read_frame(peer).unwrap().expect("one frame");
    decode_commands(&payload).unwrap()
}

#[test]
fn flush_without_connection_discards_buffer() {
    let mut channel = Channel::new();
    channel.queue(&Command::Clear);
    assert!(channel.pending_len() > 0);
    channel.flush().unwrap();
    assert_eq!(channel.pending_len(), 0);
    assert!(!channel.is_connected());
}

#[test]
fn flush_sends_whole_buffer_as_one_frame_in_order() {
    let (mut channel, mut peer) = connected_pair();
    let commands = vec![
        Command::Deactivate,
        Command::Move(PointF { x: 1.0, y: 2.0 }),
        Command::Vector(PointF { x: 3.0, y: 4.0 }),
        Command::Done,
    ];
    for command in &commands {
        channel.queue(command);
    }
    channel.flush().unwrap();
    assert_eq!(channel.pending_len(), 0);
    assert_eq!(receive_commands(&mut peer), commands);
}

#[test]
fn flush_loops_over_short_writes() {
    let (mut channel, mut peer) = connected_pair();
    channel.queue(&Command::SetTitle("short writes".to_string()));
    channel.queue(&Command::PutText {
        at: Point { x: 1, y: 1 },
        text: "abc".to_string(),
    });
    let frame_len = channel.pending_len() + crate::protocol::FRAME_HEADER_LEN;

    reset_flush_counters();
    set_write_chunk_limit(Some(3));
    let result = channel.flush();
    set_write_chunk_limit(None);

    result.unwrap();
    assert_eq!(channel.pending_len(), 0);
    assert_eq!(flush_write_count(), frame_len.div_ceil(3));
    let received = receive_commands(&mut peer);
    assert_eq!(received.len(), 2);
    assert_eq!(received[0], Command::SetTitle("short writes".to_string()));
}

#[test]
fn flush_waits_for_writability_when_socket_fills() {
    let (mut channel, mut peer) = connected_pair();
    let rgba = vec![7u8; 4 * 512 * 512];
    channel.queue(&Command::Image {
        corners: [Point { x: 0, y: 0 }; 4],
        image: Image {
            width: 512,
            height: 512,
            rgba: rgba.clone(),
        },
    });

    shrink_send_buffer(&channel);
    let reader = thread::spawn(move || {
        thread::sleep(Duration::from_millis(100));
        receive_commands(&mut peer)
    });
    reset_flush_counters();
    channel.flush().unwrap();
    assert!(writable_wait_count() >= 1, "expected at least one POLLOUT wait");
    assert_eq!(channel.pending_len(), 0);

    let received = reader.join().unwrap();
    match &received[0] {
        Command::Image { image, .. } => assert_eq!(image.rgba, rgba),
        other => panic!("unexpected command {other:?}"),
    }
}

#[test]
fn flush_failure_disconnects_and_empties_buffer() {
    let (mut channel, peer) = connected_pair();
    drop(peer);
    channel.queue(&Command::Exit);
    let err = channel.flush().unwrap_err();
    assert!(matches!(err, LinkError::Channel(_)));
    assert!(!channel.is_connected());
    assert_eq!(channel.pending_len(), 0);

    channel.queue(&Command::Exit);
    channel.flush().unwrap();
}

#[test]
fn inbound_records_are_split_on_record_boundaries() {
    let (mut channel, mut peer) = connected_pair();
    let motion = InboundEvent::new(EventKind::Motion, 5, 6, 0, 0);
    let key = InboundEvent::new(EventKind::KeyPress, 0, 0, 'a' as i32, 0);
    let mut raw = motion.to_bytes().to_vec();
    raw.extend_from_slice(&key.to_bytes()[..10]);
    peer.write_all(&raw).unwrap();

    assert_eq!(
        channel.read_available().unwrap(),
        ReadOutcome::Data(EVENT_RECORD_SIZE + 10)
    );
    assert_eq!(channel.next_event(), Some(motion));
    assert_eq!(channel.next_event(), None);

    peer.write_all(&key.to_bytes()[10..]).unwrap();
    channel.read_available().unwrap();
    assert_eq!(channel.next_event(), Some(key));
}

#[test]
fn read_reports_closed_peer() {
    let (mut channel, peer) = connected_pair();
    drop(peer);
    assert_eq!(channel.read_available().unwrap(), ReadOutcome::Closed);
}

#[test]
fn read_without_connection_reports_closed() {
    let mut channel = Channel::new();
    assert_eq!(channel.read_available().unwrap(), ReadOutcome::Closed);
    assert_eq!(channel.raw_fd(), None);
}

#[test]
fn attach_records_peer_and_disconnect_clears_it() {
    let (mut channel, _peer) = connected_pair();
    assert_eq!(channel.peer(), Some("plotterm-test"));
    assert!(channel.raw_fd().is_some());
    channel.disconnect();
    assert_eq!(channel.peer(), None);
    assert!(!channel.is_connected());
}
