use super::bus::{MessageBus, Subscription};
use super::message::HostMessage;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq)]
pub enum FrameEvent {
    /// First non-zero height reported for the current unit.
    Loaded { height: f64 },
    Resized { height: f64 },
}

/// Rendered state of the embedded content for one unit.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitFrame {
    unit_id: String,
    height: f64,
    loaded: bool,
}

impl UnitFrame {
    pub fn new(unit_id: impl Into<String>) -> Self {
        Self {
            unit_id: unit_id.into(),
            height: 0.0,
            loaded: false,
        }
    }

    pub fn unit_id(&self) -> &str {
        &self.unit_id
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn handle(&mut self, message: &HostMessage) -> FrameEvent {
        match message {
            HostMessage::Resize { height } => {
                let height = *height;
                self.height = height;
                if !self.loaded && height > 0.0 {
                    self.loaded = true;
                    tracing::debug!(unit_id = %self.unit_id, height, "unit content loaded");
                    FrameEvent::Loaded { height }
                } else {
                    FrameEvent::Resized { height }
                }
            }
        }
    }

    /// Switches to another unit; load tracking starts over.
    pub fn reset(&mut self, unit_id: impl Into<String>) {
        self.unit_id = unit_id.into();
        self.height = 0.0;
        self.loaded = false;
    }

    /// Wires a frame to the bus. The frame stops receiving messages once the
    /// returned [`AttachedFrame`] is dropped.
    pub fn attach(bus: &MessageBus, unit_id: impl Into<String>) -> AttachedFrame {
        let frame = Arc::new(Mutex::new(UnitFrame::new(unit_id)));
        let owner = frame
            .lock()
            .expect("unit frame lock poisoned")
            .unit_id
            .clone();
        let (tx, events) = mpsc::unbounded_channel();

        let handler_frame = frame.clone();
        let subscription = bus.subscribe(owner, move |message| {
            let event = handler_frame
                .lock()
                .expect("unit frame lock poisoned")
                .handle(message);
            let _ = tx.send(event);
        });

        AttachedFrame {
            frame,
            events,
            _subscription: subscription,
        }
    }
}

pub struct AttachedFrame {
    frame: Arc<Mutex<UnitFrame>>,
    pub events: mpsc::UnboundedReceiver<FrameEvent>,
    _subscription: Subscription,
}

impl AttachedFrame {
    pub fn snapshot(&self) -> UnitFrame {
        self.frame.lock().expect("unit frame lock poisoned").clone()
    }

    pub fn reset(&self, unit_id: impl Into<String>) {
        self.frame
            .lock()
            .expect("unit frame lock poisoned")
            .reset(unit_id);
    }
}
