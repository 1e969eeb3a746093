use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use sd_engine::filter::FilterKind;
use sd_engine::registry::{LiveNote, NoteRegistry};
use sd_engine::voice::Voice;
use sd_engine::{audio_graph, plan_note, FrameClock, NoteSink};
use sd_ir::{AudioBuffer, Channel, Sample, StepPattern};

const SR: u32 = 48000;

fn channel() -> Channel {
    let data: Vec<f32> = (0..SR).map(|i| ((i as f32) * 0.05).sin() * 0.5).collect();
    let sample = Sample::new("tone", AudioBuffer::from_mono(data), SR);
    let mut ch = Channel::with_sample("tone", Arc::new(sample));
    ch.steps = StepPattern::repeating("x");
    ch.high_pass.cutoff = 80.0;
    ch.low_pass.cutoff = 9000.0;
    ch.eq.low = 3.0;
    ch.eq.mid = -2.0;
    ch.eq.high = 1.5;
    ch.fade_in = 0.01;
    ch.fade_out = 0.2;
    ch
}

fn bench_graph_render(c: &mut Criterion) {
    let ch = channel();
    c.bench_function("graph_render_512_frames_16_voices", |b| {
        b.iter_batched(
            || {
                let (graph, mut handle) = audio_graph(FrameClock::new(SR));
                let mut reg = NoteRegistry::new();
                for i in 0..16 {
                    let plan = plan_note(&ch, i, 0, 0.0).expect("active step");
                    let key = reg.insert(LiveNote {
                        channel: i,
                        step: 0,
                        scheduled_time: 0.0,
                        audible_duration: plan.audible_duration,
                        absolute_step: 0,
                    });
                    handle.start_note(key, Voice::from_plan(&plan, SR)).expect("queue");
                }
                (graph, handle)
            },
            |(mut graph, _handle)| {
                let mut out = [0.0f32; 1024];
                graph.render_interleaved(&mut out, 2);
                black_box(out);
            },
            criterion::BatchSize::SmallInput,
        )
    });
}

fn bench_plan_note(c: &mut Criterion) {
    let ch = channel();
    c.bench_function("plan_note_full_chain", |b| {
        b.iter(|| {
            let plan = plan_note(black_box(&ch), 0, 0, 1.0);
            black_box(plan.map(|p| p.stages.iter().filter(|k| matches!(k, FilterKind::Peaking { .. })).count()))
        })
    });
}

criterion_group!(benches, bench_graph_render, bench_plan_note);
criterion_main!(benches);
