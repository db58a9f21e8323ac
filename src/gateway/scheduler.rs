//! Background loops: the task digest, the random daily nag, and counter cleanup.
//!
//! Wall-clock math happens in a fixed UTC offset taken from config. The digest
//! follows a cron expression; the nag fires once per day at a random minute
//! inside the configured window.

use crate::assistant::Assistant;
use crate::format::format_task_list;
use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use cron::Schedule;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::str::FromStr;
use std::sync::Arc;
use taskbot_core::{
    config::{parse_hhmm, SchedulerConfig},
    error::TaskbotError,
    message::OutgoingMessage,
    traits::Channel,
};
use taskbot_memory::Store;
use tracing::{debug, error, info, warn};

/// Fixed offset for `minutes` east of UTC.
pub fn local_offset(minutes: i32) -> Result<FixedOffset, TaskbotError> {
    FixedOffset::east_opt(minutes * 60).ok_or_else(|| {
        TaskbotError::Config(format!("utc offset out of range: {minutes} minutes"))
    })
}

/// Accept classic 5-field expressions by prepending a seconds field.
pub fn normalize_cron(expr: &str) -> String {
    let expr = expr.trim();
    if expr.split_whitespace().count() == 5 {
        format!("0 {expr}")
    } else {
        expr.to_string()
    }
}

pub fn parse_cron(expr: &str) -> Result<Schedule, TaskbotError> {
    Schedule::from_str(&normalize_cron(expr))
        .map_err(|e| TaskbotError::Config(format!("invalid cron expression '{expr}': {e}")))
}

/// Whether a digest firing on `date` should go out.
///
/// With `every_days` = N the digest is sent on days of the month divisible by
/// N. 0 and 1 both mean daily.
pub fn should_send_digest(date: NaiveDate, every_days: u32) -> bool {
    every_days <= 1 || date.day() % every_days == 0
}

/// Send the formatted list to every chat with open tasks.
///
/// Per-chat failures are logged and the sweep continues. Returns the number
/// of chats that received the list.
pub async fn send_digest(
    store: &Store,
    channel: &dyn Channel,
    now: DateTime<Utc>,
) -> Result<usize, TaskbotError> {
    let chats = store.get_all_chats_with_tasks().await?;
    let mut sent = 0;

    for chat_id in &chats {
        let tasks = match store.get_tasks(*chat_id).await {
            Ok(tasks) if tasks.is_empty() => continue,
            Ok(tasks) => tasks,
            Err(e) => {
                error!("digest: failed to load tasks for chat {chat_id}: {e}");
                continue;
            }
        };
        let msg = OutgoingMessage::html(*chat_id, format_task_list(&tasks, now));
        match channel.send(msg).await {
            Ok(_) => sent += 1,
            Err(e) => error!("digest: failed to send to chat {chat_id}: {e}"),
        }
    }

    info!("digest completed for {sent}/{} chats", chats.len());
    Ok(sent)
}

/// Background task: send the digest on every cron firing.
pub async fn digest_loop(
    store: Store,
    channel: Arc<dyn Channel>,
    schedule: Schedule,
    offset: FixedOffset,
    every_days: u32,
) {
    loop {
        let now = Utc::now().with_timezone(&offset);
        let Some(next) = schedule.after(&now).next() else {
            warn!("digest schedule has no upcoming firings, stopping");
            return;
        };
        info!("next digest at {next}");
        tokio::time::sleep((next - now).to_std().unwrap_or_default()).await;

        if !should_send_digest(next.date_naive(), every_days) {
            debug!("digest skipped on {} (every {every_days} days)", next.date_naive());
            continue;
        }
        if let Err(e) = send_digest(&store, channel.as_ref(), Utc::now()).await {
            error!("digest failed: {e}");
        }
    }
}

/// Daily window the nag is drawn from, `[start, end)` local time.
#[derive(Debug, Clone, Copy)]
pub struct NagWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl NagWindow {
    pub fn from_config(config: &SchedulerConfig) -> Result<Self, TaskbotError> {
        let start = parse_hhmm(&config.nag_window_start)?;
        let end = parse_hhmm(&config.nag_window_end)?;
        if start >= end {
            return Err(TaskbotError::Config(format!(
                "nag window must start before it ends ({start} >= {end})"
            )));
        }
        Ok(Self { start, end })
    }

    /// A uniformly random whole minute inside the window on `date`.
    fn pick<R: Rng>(
        &self,
        date: NaiveDate,
        offset: FixedOffset,
        rng: &mut R,
    ) -> Option<DateTime<FixedOffset>> {
        let minutes = (self.end - self.start).num_minutes();
        if minutes <= 0 {
            return None;
        }
        let time = self.start + Duration::minutes(rng.gen_range(0..minutes));
        offset.from_local_datetime(&date.and_time(time)).single()
    }
}

/// Next nag instant strictly after `after`.
///
/// Draws from the window of `after`'s local day; if that draw is not in the
/// future, draws again from the next day's window.
pub fn next_nag_time<R: Rng>(
    after: DateTime<FixedOffset>,
    window: &NagWindow,
    rng: &mut R,
) -> Option<DateTime<FixedOffset>> {
    let offset = *after.offset();
    let today = after.date_naive();
    match window.pick(today, offset, rng) {
        Some(at) if at > after => Some(at),
        _ => window.pick(today.succ_opt()?, offset, rng),
    }
}

/// Send one generated nag to every chat with open tasks.
///
/// Chats get nothing when the nagger returns no text.
pub async fn send_nags(
    store: &Store,
    channel: &dyn Channel,
    assistant: &Assistant,
) -> Result<usize, TaskbotError> {
    let chats = store.get_all_chats_with_tasks().await?;
    let mut sent = 0;

    for chat_id in chats {
        let text = match assistant.generate_nag().await {
            Ok(Some(text)) => text,
            Ok(None) => {
                debug!("nag: nothing generated for chat {chat_id}");
                continue;
            }
            Err(e) => {
                warn!("nag: generation failed for chat {chat_id}: {e}");
                continue;
            }
        };
        match channel.send(OutgoingMessage::text(chat_id, text)).await {
            Ok(_) => sent += 1,
            Err(e) => error!("nag: failed to send to chat {chat_id}: {e}"),
        }
    }

    info!("nag sent to {sent} chats");
    Ok(sent)
}

/// Background task: one nag per day at a random minute in the window.
pub async fn nag_loop(
    store: Store,
    channel: Arc<dyn Channel>,
    assistant: Arc<Assistant>,
    window: NagWindow,
    offset: FixedOffset,
) {
    let mut rng = StdRng::from_entropy();
    let mut after = Utc::now().with_timezone(&offset);

    loop {
        let Some(at) = next_nag_time(after, &window, &mut rng) else {
            warn!("could not compute the next nag time, stopping");
            return;
        };
        info!("next nag at {at}");

        let now = Utc::now().with_timezone(&offset);
        tokio::time::sleep((at - now).to_std().unwrap_or_default()).await;

        if let Err(e) = send_nags(&store, channel.as_ref(), &assistant).await {
            error!("nag failed: {e}");
        }

        // Never twice on the same local day.
        after = match at
            .date_naive()
            .succ_opt()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .and_then(|midnight| offset.from_local_datetime(&midnight).single())
        {
            Some(midnight) => midnight,
            None => return,
        };
    }
}

/// Background task: prune message counters on a fixed interval.
pub async fn cleanup_loop(store: Store, every_mins: u64) {
    let period = std::time::Duration::from_secs(every_mins.max(1) * 60);
    let mut interval = tokio::time::interval(period);
    loop {
        interval.tick().await;
        match store.cleanup_old_message_counts(Utc::now()).await {
            Ok(n) if n > 0 => info!("cleanup: removed {n} old message counters"),
            Ok(_) => {}
            Err(e) => error!("cleanup failed: {e}"),
        }
    }
}
