use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};

/// Speech synthesis and recognition. All operations are fire-and-forget;
/// recognised text comes back as `Event::VoiceTranscript`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum SpeechOperation {
    Speak { text: String },
    StopSpeaking,
    StartListening,
    StopListening,
}

impl Operation for SpeechOperation {
    type Output = ();
}

pub struct Speech<Ev> {
    context: CapabilityContext<SpeechOperation, Ev>,
}

impl<Ev> Capability<Ev> for Speech<Ev> {
    type Operation = SpeechOperation;
    type MappedSelf<MappedEv> = Speech<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        Speech::new(self.context.map_event(f))
    }
}

impl<Ev> Speech<Ev>
where
    Ev: 'static,
{
    pub fn new(context: CapabilityContext<SpeechOperation, Ev>) -> Self {
        Self { context }
    }

    pub fn speak(&self, text: String) {
        self.notify(SpeechOperation::Speak { text });
    }

    pub fn stop_speaking(&self) {
        self.notify(SpeechOperation::StopSpeaking);
    }

    pub fn start_listening(&self) {
        self.notify(SpeechOperation::StartListening);
    }

    pub fn stop_listening(&self) {
        self.notify(SpeechOperation::StopListening);
    }

    fn notify(&self, operation: SpeechOperation) {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            ctx.notify_shell(operation).await;
        });
    }
}
