use chatbowl::api::StreamRecord;
use chatbowl::core::chat::Chat;
use chatbowl::core::chat_stream::{LineFramer, StreamEvent};
use chatbowl::core::message::Message;
use chatbowl::core::session::SessionContext;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

fn make_payload(lines: usize) -> Vec<u8> {
    let mut payload = Vec::new();
    for i in 0..lines {
        payload.extend_from_slice(
            format!("data: {{\"content\":\"chunk {i} of the response body\"}}\n").as_bytes(),
        );
    }
    payload
}

fn bench_line_framer(c: &mut Criterion) {
    let payload = make_payload(1000);
    let mut group = c.benchmark_group("line_framer");
    group.throughput(Throughput::Bytes(payload.len() as u64));

    for &chunk_size in &[16usize, 256, 4096] {
        group.bench_with_input(
            BenchmarkId::new("push", chunk_size),
            &chunk_size,
            |b, &chunk_size| {
                b.iter(|| {
                    let mut framer = LineFramer::new();
                    let mut released = 0usize;
                    for chunk in payload.chunks(chunk_size) {
                        released += framer.push(chunk).len();
                    }
                    released
                });
            },
        );
    }
    group.finish();
}

fn bench_reconciler(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconciler");

    for &fragments in &[100usize, 1000] {
        group.bench_with_input(
            BenchmarkId::new("stream_session", fragments),
            &fragments,
            |b, &fragments| {
                b.iter(|| {
                    let mut chat = Chat::temporary("llama3");
                    chat.history.push(Message::user("benchmark prompt"));
                    let mut session = SessionContext::new(chat);
                    session.begin_stream();
                    for i in 0..fragments {
                        session.apply_stream_event(StreamEvent::Record(StreamRecord {
                            content: Some(format!("fragment {i} ")),
                            done: false,
                            error: None,
                        }));
                    }
                    session.apply_stream_event(StreamEvent::Record(StreamRecord {
                        content: None,
                        done: true,
                        error: None,
                    }));
                    session.chat.history.len()
                });
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_line_framer, bench_reconciler);
criterion_main!(benches);
