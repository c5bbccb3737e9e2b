use crate::domain::models::{Block, TimedBlock};

pub const MINUTES_PER_DAY: i64 = 1440;

const DEFAULT_BLOCK_MINUTES: u32 = 10;
const MINUTES_PER_SET: u32 = 2;

/// Parses a 24-hour `HH:MM` clock string into minutes since midnight.
pub fn time_to_minutes(value: &str) -> Result<i64, String> {
    let mut split = value.split(':');
    let (Some(hour_str), Some(minute_str), None) = (split.next(), split.next(), split.next())
    else {
        return Err(format!("invalid clock time: {value:?}"));
    };

    let hour = hour_str
        .parse::<i64>()
        .map_err(|_| format!("invalid clock time: {value:?}"))?;
    let minute = minute_str
        .parse::<i64>()
        .map_err(|_| format!("invalid clock time: {value:?}"))?;
    if !(0..24).contains(&hour) || !(0..60).contains(&minute) {
        return Err(format!("invalid clock time: {value:?}"));
    }
    Ok(hour * 60 + minute)
}

/// Formats a minute offset as zero-padded `HH:MM`, wrapping any value
/// (including negative ones) into `[0, 1440)`. A negative input reads as
/// "this many minutes before midnight", which is how backward layout spills
/// into the previous day.
pub fn minutes_to_time(minutes: i64) -> String {
    let wrapped = minutes.rem_euclid(MINUTES_PER_DAY);
    format!("{:02}:{:02}", wrapped / 60, wrapped % 60)
}

/// Effective duration of a block: the fixed minutes when set, else two
/// minutes per set, else ten minutes flat.
pub fn block_duration_min(block: &Block) -> u32 {
    if let Some(minutes) = block.duration_min {
        return minutes;
    }
    if let Some(sets) = block.sets {
        return sets * MINUTES_PER_SET;
    }
    DEFAULT_BLOCK_MINUTES
}

/// Lays the blocks out backward from the arrival time: the final block ends
/// exactly at arrival, everything earlier stacks contiguously in front of
/// it. An empty routine yields an empty schedule.
pub fn compute_schedule(arrival_time: &str, blocks: &[Block]) -> Result<Vec<TimedBlock>, String> {
    if blocks.is_empty() {
        return Ok(Vec::new());
    }

    let total_minutes: i64 = blocks
        .iter()
        .map(|block| i64::from(block_duration_min(block)))
        .sum();
    let mut cursor = time_to_minutes(arrival_time)? - total_minutes;

    let mut timed = Vec::with_capacity(blocks.len());
    for block in blocks {
        let start_time = minutes_to_time(cursor);
        cursor += i64::from(block_duration_min(block));
        timed.push(TimedBlock {
            block: block.clone(),
            start_time,
        });
    }
    Ok(timed)
}

/// Index of the block whose window contains `now` (minutes since midnight),
/// if any. Windows are half-open `[start, start + duration)` on the same
/// clock face; a window that crosses midnight is not chased across it.
pub fn block_in_progress(schedule: &[TimedBlock], now_minutes: i64) -> Option<usize> {
    schedule.iter().position(|timed| {
        let Ok(start) = time_to_minutes(&timed.start_time) else {
            return false;
        };
        let end = start + i64::from(block_duration_min(&timed.block));
        now_minutes >= start && now_minutes < end
    })
}
