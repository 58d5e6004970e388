use analyzeme::ProfilingData;
use anyhow::anyhow;
use rayon::prelude::*;
use std::cmp::Reverse;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use traceview::{NodeKind, NodeSpec, TraceTree};

#[derive(Debug, Clone)]
pub struct TraceMeta {
    pub cmd: String,
    pub pid: u32,
    pub event_count: usize,
    pub thread_count: usize,
    pub duration_ns: u64,
    pub load_duration_ns: u64,
}

pub struct LoadedTrace {
    pub tree: TraceTree,
    pub meta: TraceMeta,
}

/// Moves a loaded trace through a message, which has to be cloneable. The
/// first `take` wins.
#[derive(Clone)]
pub struct Handoff(Arc<Mutex<Option<LoadedTrace>>>);

impl Handoff {
    pub fn new(trace: LoadedTrace) -> Self {
        Self(Arc::new(Mutex::new(Some(trace))))
    }

    pub fn take(&self) -> Option<LoadedTrace> {
        self.0.lock().ok()?.take()
    }
}

impl fmt::Debug for Handoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Handoff")
    }
}

#[derive(Debug, Clone, PartialEq)]
struct RawEvent {
    label: String,
    start_ns: u64,
    end_ns: u64,
}

/// Loads a measureme profile. Every thread becomes a transaction whose spans
/// are only attached when the thread is first opened.
pub fn load_trace(path: &Path) -> anyhow::Result<LoadedTrace> {
    let started = Instant::now();
    let stem = path.with_extension("");
    let data = ProfilingData::new(&stem)
        .map_err(|err| anyhow!("failed to load profiling data from {stem:?}: {err}"))?;
    let metadata = data.metadata();

    let mut threads: HashMap<u64, Vec<RawEvent>> = HashMap::new();
    let mut min_ns = u64::MAX;
    let mut max_ns = 0;
    let mut event_count = 0;

    for lightweight_event in data.iter() {
        let event = data.to_full_event(&lightweight_event);
        let analyzeme::EventPayload::Timestamp(analyzeme::Timestamp::Interval { start, end }) =
            &event.payload
        else {
            continue;
        };
        let start_ns = start
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos() as u64;
        let end_ns = end
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos() as u64;

        min_ns = min_ns.min(start_ns);
        max_ns = max_ns.max(end_ns);
        event_count += 1;
        threads
            .entry(event.thread_id as u64)
            .or_default()
            .push(RawEvent {
                label: event.label.to_string(),
                start_ns,
                end_ns,
            });
    }

    if event_count == 0 {
        return Err(anyhow!("{} contains no interval events", path.display()));
    }

    let mut threads: Vec<(u64, Vec<RawEvent>)> = threads.into_iter().collect();
    threads.sort_by_key(|(thread_id, _)| *thread_id);
    let thread_count = threads.len();

    let children: Vec<NodeSpec> = threads
        .into_par_iter()
        .map(|(thread_id, events)| thread_spec(thread_id, events, min_ns))
        .collect();

    let duration_ns = max_ns.saturating_sub(min_ns);
    let root = NodeSpec::new(
        NodeKind::Trace,
        "root",
        metadata.cmd.clone(),
        0.0,
        duration_ns as f64,
    )
    .with_children(children);
    let tree = TraceTree::new(root);

    let load_duration_ns = started.elapsed().as_nanos() as u64;
    log::info!(
        "loaded {event_count} events on {thread_count} threads from {} in {:.1} ms",
        path.display(),
        load_duration_ns as f64 / 1_000_000.0
    );

    Ok(LoadedTrace {
        tree,
        meta: TraceMeta {
            cmd: metadata.cmd.clone(),
            pid: metadata.process_id,
            event_count,
            thread_count,
            duration_ns,
            load_duration_ns,
        },
    })
}

/// One thread as a transaction node. Spans are nested by containment and
/// timestamps are made relative to `origin_ns`.
fn thread_spec(thread_id: u64, mut events: Vec<RawEvent>, origin_ns: u64) -> NodeSpec {
    events.sort_by_key(|event| (event.start_ns, Reverse(event.end_ns)));

    let thread_start = events.first().map_or(origin_ns, |event| event.start_ns);
    let thread_end = events.iter().map(|event| event.end_ns).max().unwrap_or(thread_start);

    let mut roots = Vec::new();
    let mut stack: Vec<(u64, NodeSpec)> = Vec::new();
    for (index, event) in events.into_iter().enumerate() {
        while stack
            .last()
            .is_some_and(|(end_ns, _)| *end_ns <= event.start_ns)
        {
            close_span(&mut stack, &mut roots);
        }
        let spec = NodeSpec::new(
            NodeKind::Span,
            format!("{thread_id}-{index}"),
            event.label,
            (event.start_ns - origin_ns) as f64,
            event.end_ns.saturating_sub(event.start_ns) as f64,
        );
        stack.push((event.end_ns, spec));
    }
    while !stack.is_empty() {
        close_span(&mut stack, &mut roots);
    }

    NodeSpec::new(
        NodeKind::Transaction,
        format!("thread-{thread_id}"),
        format!("Thread {thread_id}"),
        (thread_start - origin_ns) as f64,
        (thread_end - thread_start) as f64,
    )
    .with_deferred(roots)
}

fn close_span(stack: &mut Vec<(u64, NodeSpec)>, roots: &mut Vec<NodeSpec>) {
    let Some((_, span)) = stack.pop() else {
        return;
    };
    match stack.last_mut() {
        Some((_, parent)) => parent.children.push(span),
        None => roots.push(span),
    }
}

pub fn format_panic_payload(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("Loading thread panicked: {}", message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("Loading thread panicked: {}", message)
    } else {
        "Loading thread panicked with unknown payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(label: &str, start_ns: u64, end_ns: u64) -> RawEvent {
        RawEvent {
            label: label.to_string(),
            start_ns,
            end_ns,
        }
    }

    #[test]
    fn spans_nest_by_containment() {
        let thread = thread_spec(
            7,
            vec![
                event("sibling", 1_060, 1_090),
                event("outer", 1_000, 1_050),
                event("inner", 1_010, 1_020),
                event("inner2", 1_020, 1_050),
            ],
            1_000,
        );
        assert_eq!(thread.id, "thread-7");
        assert_eq!(thread.start, 0.0);
        assert_eq!(thread.duration, 90.0);
        assert!(thread.children.is_empty());

        let labels: Vec<&str> = thread.deferred.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["outer", "sibling"]);
        let nested: Vec<&str> = thread.deferred[0]
            .children
            .iter()
            .map(|s| s.label.as_str())
            .collect();
        assert_eq!(nested, vec!["inner", "inner2"]);
        assert_eq!(thread.deferred[0].children[0].start, 10.0);
    }

    #[test]
    fn equal_starts_put_the_longer_span_outside() {
        let thread = thread_spec(1, vec![event("short", 0, 5), event("long", 0, 10)], 0);
        assert_eq!(thread.deferred.len(), 1);
        assert_eq!(thread.deferred[0].label, "long");
        assert_eq!(thread.deferred[0].children[0].label, "short");
    }

    #[test]
    fn panic_payloads_are_readable() {
        let message = format_panic_payload(Box::new("boom"));
        assert_eq!(message, "Loading thread panicked: boom");
    }
}
