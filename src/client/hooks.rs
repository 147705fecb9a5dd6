//! Push-style consumption of session messages.
//!
//! A [`Hook`] binds a callback to either one ask or one
//! `(message_type, message_subtype)` pair. [`dispatch`] routes each message to
//! at most one hook; messages nobody registered for are dropped with a log
//! line.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};

use crate::error::{Result, TechreadError};
use crate::protocol::{Ask, ControlMessage, MessageSubtype, MessageType};

/// Callback invoked with a matching message.
///
/// All callbacks run through the same async call path; synchronous closures
/// are wrapped by [`HookCallback::new`].
#[derive(Clone)]
pub struct HookCallback(Arc<dyn Fn(ControlMessage) -> BoxFuture<'static, ()> + Send + Sync>);

impl HookCallback {
    /// Wrap a synchronous closure
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(ControlMessage) + Send + Sync + 'static,
    {
        Self(Arc::new(move |message| {
            f(message);
            futures::future::ready(()).boxed()
        }))
    }

    /// Wrap an async closure
    pub fn new_async<F, Fut>(f: F) -> Self
    where
        F: Fn(ControlMessage) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self(Arc::new(move |message| f(message).boxed()))
    }

    /// Invoke the callback
    pub async fn call(&self, message: ControlMessage) {
        (self.0)(message).await;
    }
}

/// What a hook listens for
#[derive(Debug, Clone, PartialEq)]
pub enum HookSelector {
    /// A non-ASK message type/subtype pair
    Message {
        /// Message type
        message_type: MessageType,
        /// Message subtype
        message_subtype: MessageSubtype,
    },
    /// Results for one ask
    Ask(Ask),
}

/// Callback registration for one selector
#[derive(Clone)]
pub struct Hook {
    selector: HookSelector,
    callback: Option<HookCallback>,
}

impl Hook {
    /// Hook for a message type/subtype pair
    pub fn for_message(
        message_type: MessageType,
        message_subtype: MessageSubtype,
        callback: HookCallback,
    ) -> Self {
        Self {
            selector: HookSelector::Message {
                message_type,
                message_subtype,
            },
            callback: Some(callback),
        }
    }

    /// Hook for an ask. The ask is also submitted with the request.
    pub fn for_ask(ask: Ask, callback: HookCallback) -> Self {
        Self {
            selector: HookSelector::Ask(ask),
            callback: Some(callback),
        }
    }

    /// Build a hook from loose parts.
    ///
    /// Exactly one selector must be given: either both `message_type` and
    /// `message_subtype`, or `ask`. A missing callback is accepted; such a
    /// hook still claims its messages but only logs a warning for them.
    pub fn from_parts(
        message_type: Option<MessageType>,
        message_subtype: Option<MessageSubtype>,
        ask: Option<Ask>,
        callback: Option<HookCallback>,
    ) -> Result<Self> {
        let selector = match (message_type, message_subtype, ask) {
            (None, None, Some(ask)) => HookSelector::Ask(ask),
            (Some(message_type), Some(message_subtype), None) => HookSelector::Message {
                message_type,
                message_subtype,
            },
            (_, _, Some(_)) => {
                return Err(TechreadError::Protocol(
                    "A hook selects either an ask or a message type, not both".to_string(),
                ))
            },
            _ => {
                return Err(TechreadError::Protocol(
                    "A hook needs an ask or both message_type and message_subtype".to_string(),
                ))
            },
        };

        Ok(Self { selector, callback })
    }

    /// Selector
    pub fn selector(&self) -> &HookSelector {
        &self.selector
    }

    /// Ask this hook listens for, if any
    pub fn ask(&self) -> Option<&Ask> {
        match &self.selector {
            HookSelector::Ask(ask) => Some(ask),
            HookSelector::Message { .. } => None,
        }
    }

    fn matches(&self, message: &ControlMessage) -> bool {
        match (&self.selector, message.message_type) {
            (HookSelector::Ask(ask), MessageType::Ask) => {
                message.message_subtype.is_ask(ask.ask_type())
            },
            (
                HookSelector::Message {
                    message_type,
                    message_subtype,
                },
                other,
            ) if other != MessageType::Ask => {
                *message_type == other && *message_subtype == message.message_subtype
            },
            _ => false,
        }
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hook")
            .field("selector", &self.selector)
            .field("callback", &self.callback.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

/// First hook matching `message`, if any
pub fn select_hook<'a>(message: &ControlMessage, hooks: &'a [Hook]) -> Option<&'a Hook> {
    hooks.iter().find(|hook| hook.matches(message))
}

/// Route `message` to its hook. Returns whether a callback ran.
pub async fn dispatch(message: ControlMessage, hooks: &[Hook]) -> bool {
    let Some(hook) = select_hook(&message, hooks) else {
        tracing::warn!(
            "Ignoring message of type {}:{} - no hook registered",
            message.message_type,
            message.message_subtype
        );
        return false;
    };

    let Some(callback) = &hook.callback else {
        tracing::warn!(
            "Hook for {}:{} has no callable function; dropping message",
            message.message_type,
            message.message_subtype
        );
        return false;
    };

    callback.call(message).await;
    true
}
