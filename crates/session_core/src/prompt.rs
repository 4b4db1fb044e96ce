use shared::{
    domain::FramePosition,
    error::InputError,
    protocol::{OutboundMessage, PromptScheduleRequest},
};

use crate::{progress::ProgressTracker, reset::Resettable};

/// Lead time added to a non-zero frame so a new prompt lands after the frames
/// the engine has already committed to.
pub const SCHEDULE_OFFSET: FramePosition = 3;

/// Prompt used by a direct start when nothing has been submitted yet.
pub const DEFAULT_DIRECT_PROMPT: &str = "Full skeleton with glowing green eye sockets, exposed skull and ribcage, \
bony hands with long skeletal fingers reaching forward, complete leg bones and spine visible, \
tattered black robes, swirling green fog, dark graveyard background, moonlight on white bones, \
jaw open showing teeth, standing pose, photorealistic, 4k quality";

pub fn target_frame(current_frame: FramePosition) -> FramePosition {
    if current_frame == 0 {
        0
    } else {
        current_frame.saturating_add(SCHEDULE_OFFSET)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub request: PromptScheduleRequest,
    pub starts_session: bool,
}

impl Submission {
    /// Messages in dispatch order: the schedule first, then `start` if this
    /// submission began the session.
    pub fn into_messages(self) -> Vec<OutboundMessage> {
        let mut messages = vec![OutboundMessage::SchedulePrompt(self.request)];
        if self.starts_session {
            messages.push(OutboundMessage::Start);
        }
        messages
    }
}

#[derive(Debug, Default)]
pub struct PromptScheduler {
    started: bool,
    active_prompt: Option<String>,
}

impl PromptScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn active_prompt(&self) -> Option<&str> {
        self.active_prompt.as_deref()
    }

    pub fn submit(
        &mut self,
        prompt_text: &str,
        progress: &ProgressTracker,
    ) -> Result<Submission, InputError> {
        let prompt = prompt_text.trim();
        if prompt.is_empty() {
            return Err(InputError::EmptyPrompt);
        }

        let current_frame = progress.current_frame();
        // `start` begins the session once; a frame that reads 0 again after an
        // engine loop must not restart it.
        let starts_session = current_frame == 0 && !self.started;
        if starts_session {
            self.started = true;
        }
        self.active_prompt = Some(prompt.to_string());

        Ok(Submission {
            request: PromptScheduleRequest {
                new_prompt: prompt.to_string(),
                timestamp: target_frame(current_frame),
            },
            starts_session,
        })
    }

    /// Starts a model that takes a replacing prompt instead of a schedule:
    /// `set_prompt` then `start`. Uses `prompt_text`, else the active prompt,
    /// else [`DEFAULT_DIRECT_PROMPT`]. Returns `Ok(None)` once started.
    pub fn start_direct(
        &mut self,
        prompt_text: Option<&str>,
    ) -> Result<Option<Vec<OutboundMessage>>, InputError> {
        let prompt = match prompt_text.map(str::trim) {
            Some("") => return Err(InputError::EmptyPrompt),
            Some(text) => text.to_string(),
            None => self
                .active_prompt
                .clone()
                .unwrap_or_else(|| DEFAULT_DIRECT_PROMPT.to_string()),
        };
        if self.started {
            return Ok(None);
        }
        self.started = true;
        self.active_prompt = Some(prompt.clone());
        Ok(Some(vec![
            OutboundMessage::SetPrompt { prompt },
            OutboundMessage::Start,
        ]))
    }
}

impl Resettable for PromptScheduler {
    fn reset(&mut self) {
        self.started = false;
        self.active_prompt = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_frame_leads_non_zero_frames() {
        assert_eq!(target_frame(0), 0);
        assert_eq!(target_frame(1), 4);
        assert_eq!(target_frame(50), 53);
        assert_eq!(target_frame(FramePosition::MAX), FramePosition::MAX);
    }

    #[test]
    fn first_prompt_schedules_then_starts() {
        let mut scheduler = PromptScheduler::new();
        let progress = ProgressTracker::new();

        let submission = scheduler.submit("a", &progress).expect("submit");
        assert_eq!(
            submission.into_messages(),
            vec![
                OutboundMessage::SchedulePrompt(PromptScheduleRequest {
                    new_prompt: "a".into(),
                    timestamp: 0,
                }),
                OutboundMessage::Start,
            ]
        );
        assert!(scheduler.is_started());
        assert_eq!(scheduler.active_prompt(), Some("a"));
    }

    #[test]
    fn later_prompt_is_offset_without_start() {
        let mut scheduler = PromptScheduler::new();
        let mut progress = ProgressTracker::new();
        progress.on_progress(50);

        let submission = scheduler.submit("b", &progress).expect("submit");
        assert_eq!(
            submission.into_messages(),
            vec![OutboundMessage::SchedulePrompt(PromptScheduleRequest {
                new_prompt: "b".into(),
                timestamp: 53,
            })]
        );
    }

    #[test]
    fn rapid_submissions_at_frame_zero_start_once() {
        let mut scheduler = PromptScheduler::new();
        let progress = ProgressTracker::new();

        let starts = (0..4)
            .map(|i| scheduler.submit(&format!("p{i}"), &progress).expect("submit"))
            .filter(|submission| {
                assert_eq!(submission.request.timestamp, 0);
                submission.starts_session
            })
            .count();
        assert_eq!(starts, 1);
        assert_eq!(scheduler.active_prompt(), Some("p3"));
    }

    #[test]
    fn frame_reading_zero_again_does_not_restart() {
        let mut scheduler = PromptScheduler::new();
        let mut progress = ProgressTracker::new();

        assert!(scheduler.submit("a", &progress).expect("submit").starts_session);
        progress.on_progress(30);
        progress.on_progress(0);
        assert!(!scheduler.submit("b", &progress).expect("submit").starts_session);
    }

    #[test]
    fn blank_prompt_is_rejected_without_side_effects() {
        let mut scheduler = PromptScheduler::new();
        let progress = ProgressTracker::new();

        assert_eq!(
            scheduler.submit(" \t\n", &progress),
            Err(InputError::EmptyPrompt)
        );
        assert!(!scheduler.is_started());
        assert_eq!(scheduler.active_prompt(), None);
    }

    #[test]
    fn prompt_text_is_trimmed() {
        let mut scheduler = PromptScheduler::new();
        let progress = ProgressTracker::new();

        let submission = scheduler.submit("  neon alley  ", &progress).expect("submit");
        assert_eq!(submission.request.new_prompt, "neon alley");
        assert_eq!(scheduler.active_prompt(), Some("neon alley"));
    }

    #[test]
    fn direct_start_sets_prompt_then_starts_once() {
        let mut scheduler = PromptScheduler::new();

        assert_eq!(
            scheduler.start_direct(Some(" ember city ")).expect("start"),
            Some(vec![
                OutboundMessage::SetPrompt {
                    prompt: "ember city".into()
                },
                OutboundMessage::Start,
            ])
        );
        assert!(scheduler.is_started());
        assert_eq!(scheduler.start_direct(None).expect("start"), None);
        assert_eq!(scheduler.start_direct(Some("  ")), Err(InputError::EmptyPrompt));

        scheduler.reset();
        let messages = scheduler.start_direct(None).expect("start").expect("messages");
        assert_eq!(
            messages[0],
            OutboundMessage::SetPrompt {
                prompt: DEFAULT_DIRECT_PROMPT.into()
            }
        );
    }

    #[test]
    fn direct_start_reuses_the_active_prompt() {
        let mut scheduler = PromptScheduler::new();
        let mut progress = ProgressTracker::new();
        progress.on_progress(8);
        scheduler.submit("rain on glass", &progress).expect("submit");

        assert_eq!(
            scheduler.start_direct(None).expect("start"),
            Some(vec![
                OutboundMessage::SetPrompt {
                    prompt: "rain on glass".into()
                },
                OutboundMessage::Start,
            ])
        );
    }

    #[test]
    fn scheduled_start_blocks_direct_start() {
        let mut scheduler = PromptScheduler::new();
        let progress = ProgressTracker::new();
        scheduler.submit("a", &progress).expect("submit");

        assert_eq!(scheduler.start_direct(Some("b")).expect("start"), None);
        assert_eq!(scheduler.active_prompt(), Some("a"));
    }

    #[test]
    fn reset_allows_a_new_start() {
        let mut scheduler = PromptScheduler::new();
        let progress = ProgressTracker::new();
        scheduler.submit("a", &progress).expect("submit");

        scheduler.reset();
        assert!(!scheduler.is_started());
        assert_eq!(scheduler.active_prompt(), None);
        assert!(scheduler.submit("a", &progress).expect("submit").starts_session);
    }
}
