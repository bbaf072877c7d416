//! Operator authoring state: Idle -> AwaitingMedia -> AwaitingCaption -> publish.

use gatecast_engine::MediaRef;

/// Text an operator sends to publish without a caption.
pub const NO_CAPTION_MARKER: &str = "-";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AuthoringState {
    #[default]
    Idle,
    AwaitingMedia,
    AwaitingCaption {
        media: MediaRef,
    },
}

/// Result of feeding one operator input into the workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowStep {
    /// Media accepted; the caption is requested next.
    CaptionRequested,
    /// Caption accepted; the draft is ready to publish.
    ReadyToPublish {
        media: MediaRef,
        caption: Option<String>,
    },
    /// Input does not fit the current state.
    Ignored,
    /// Media was expected but the message carried none.
    MediaExpected,
}

#[derive(Debug, Default)]
pub struct OperatorWorkflow {
    state: AuthoringState,
}

impl OperatorWorkflow {
    pub fn state(&self) -> &AuthoringState {
        &self.state
    }

    pub fn begin_post(&mut self) {
        self.state = AuthoringState::AwaitingMedia;
    }

    /// Drops any draft in progress.
    pub fn reset(&mut self) {
        self.state = AuthoringState::Idle;
    }

    pub fn accept_media(&mut self, media: Option<MediaRef>) -> WorkflowStep {
        if self.state != AuthoringState::AwaitingMedia {
            return WorkflowStep::Ignored;
        }
        match media {
            Some(media) => {
                self.state = AuthoringState::AwaitingCaption { media };
                WorkflowStep::CaptionRequested
            }
            None => WorkflowStep::MediaExpected,
        }
    }

    /// Completes the draft and returns to idle. Blank text and the
    /// no-caption marker both publish without a caption.
    pub fn accept_caption(&mut self, text: &str) -> WorkflowStep {
        let AuthoringState::AwaitingCaption { media } = std::mem::take(&mut self.state) else {
            return WorkflowStep::Ignored;
        };
        let trimmed = text.trim();
        let caption = (!trimmed.is_empty() && trimmed != NO_CAPTION_MARKER)
            .then(|| trimmed.to_string());
        WorkflowStep::ReadyToPublish { media, caption }
    }
}
