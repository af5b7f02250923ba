use crate::models::TimeRange;
use crate::services::conflict::overlaps_any;

/// Sorts frames and joins those that touch or overlap.
pub fn merge_frames(frames: &[TimeRange]) -> Vec<TimeRange> {
    let mut sorted: Vec<TimeRange> = frames.iter().copied().filter(|f| f.start < f.end).collect();
    sorted.sort_by_key(|f| (f.start, f.end));

    let mut merged: Vec<TimeRange> = Vec::with_capacity(sorted.len());
    for frame in sorted {
        match merged.last_mut() {
            Some(last) if frame.start <= last.end => last.end = last.end.max(frame.end),
            _ => merged.push(frame),
        }
    }
    merged
}

/// Start minutes of every free slot of `duration` inside the frames.
pub fn generate_slots(
    frames: &[TimeRange],
    busy: &[TimeRange],
    duration: u32,
    window: Option<TimeRange>,
) -> Vec<u32> {
    if duration == 0 {
        return Vec::new();
    }

    let mut slots = Vec::new();
    for frame in merge_frames(frames) {
        let (start, end) = match window {
            Some(w) => (frame.start.max(w.start), frame.end.min(w.end)),
            None => (frame.start, frame.end),
        };

        let mut cursor = start;
        while cursor + duration <= end {
            let candidate = TimeRange::new(cursor, cursor + duration);
            if !overlaps_any(&candidate, busy) {
                slots.push(cursor);
            }
            cursor += duration;
        }
    }
    slots
}

pub fn fits_within_frames(frames: &[TimeRange], candidate: &TimeRange) -> bool {
    merge_frames(frames).iter().any(|f| f.contains(candidate))
}
