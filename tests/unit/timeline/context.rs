use std::io;
use std::sync::{Arc, Mutex};

use super::*;
use crate::foundation::core::FrameNumber;
use crate::timeline::segment::FrameSegment;

fn still(ctx: &mut CompilationContext, image: &str, secs: u64) -> Segment {
    ctx.create_segment(
        Timecode::ZERO,
        Timecode::from_secs(secs),
        image.to_owned(),
        SegmentBody::Frame(FrameSegment {
            frame: FrameNumber::Index(0),
            state: FrameState::Resolved {
                image: image.to_owned(),
            },
        }),
    )
}

#[test]
fn segments_are_numbered_in_creation_order() {
    let mut ctx = CompilationContext::new();
    let a = still(&mut ctx, "a.png", 1);
    let b = still(&mut ctx, "b.png", 1);
    assert_eq!((a.number, b.number), (0, 1));
    assert_eq!(ctx.next_segment_number(), 2);
}

#[test]
fn still_images_loop_for_their_duration() {
    let mut ctx = CompilationContext::new();
    still(&mut ctx, "title.png", 5);
    assert_eq!(ctx.registry().entries()[0].options, ["-loop", "1", "-t", "5"]);
}

#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl LogBuffer {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

fn capture_warnings(f: impl FnOnce()) -> String {
    let buf = LogBuffer::default();
    let writer = buf.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    tracing::subscriber::with_default(subscriber, f);
    buf.contents()
}

#[test]
fn reused_still_with_new_duration_warns() {
    let mut ctx = CompilationContext::new();
    let logs = capture_warnings(|| {
        still(&mut ctx, "title.png", 5);
        still(&mut ctx, "title.png", 20);
    });
    assert!(logs.contains("still image reused"), "{logs}");
    assert!(logs.contains("-t 20"), "{logs}");
    assert_eq!(ctx.registry().len(), 1);
    assert_eq!(
        ctx.registry().options_of("title.png"),
        Some(["-loop", "1", "-t", "20"].map(String::from).as_slice())
    );
}

#[test]
fn reused_still_with_same_duration_is_quiet() {
    let mut ctx = CompilationContext::new();
    let logs = capture_warnings(|| {
        still(&mut ctx, "title.png", 5);
        still(&mut ctx, "title.png", 5);
    });
    assert!(!logs.contains("still image reused"), "{logs}");
}

#[test]
fn reset_starts_a_fresh_run() {
    let mut ctx = CompilationContext::new();
    still(&mut ctx, "a.png", 1);
    ctx.reset();
    assert_eq!(ctx.next_segment_number(), 0);
    assert!(ctx.registry().is_empty());
    let seg = still(&mut ctx, "b.png", 1);
    assert_eq!(seg.number, 0);
    assert_eq!(ctx.registry().index_of("b.png"), Some(0));
}

#[test]
fn pending_key_is_unique_per_segment() {
    assert_eq!(pending_key("^", 3), "^#3");
    assert_ne!(pending_key("deck.pdf", 1), pending_key("deck.pdf", 2));
}
