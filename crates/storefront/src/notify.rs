//! Shopper-facing notifications.
//!
//! Cart and checkout operations report their outcome as toasts. Each browsing
//! session owns a [`ToastQueue`]; API responses drain it so the front end can
//! display whatever accumulated since the last response.

use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;

/// Visual style of a toast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ToastVariant {
    #[default]
    Default,
    Success,
    Destructive,
}

/// A transient notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Toast {
    pub variant: ToastVariant,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Display time; the front end's default applies when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl Toast {
    /// A neutral toast with a description.
    #[must_use]
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            variant: ToastVariant::Default,
            title: None,
            description: Some(description.into()),
            duration_ms: None,
        }
    }

    /// A success toast with a description.
    #[must_use]
    pub fn success(description: impl Into<String>) -> Self {
        Self {
            variant: ToastVariant::Success,
            title: None,
            description: Some(description.into()),
            duration_ms: None,
        }
    }

    /// A destructive (error) toast with a description.
    #[must_use]
    pub fn destructive(description: impl Into<String>) -> Self {
        Self {
            variant: ToastVariant::Destructive,
            title: None,
            description: Some(description.into()),
            duration_ms: None,
        }
    }

    /// A destructive toast carrying only a title.
    #[must_use]
    pub fn destructive_title(title: impl Into<String>) -> Self {
        Self {
            variant: ToastVariant::Destructive,
            title: Some(title.into()),
            description: None,
            duration_ms: None,
        }
    }

    /// Override the display time.
    #[must_use]
    pub const fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }
}

/// Sink for toasts.
pub trait Notifier: Send + Sync {
    fn notify(&self, toast: Toast);
}

/// Per-session toast buffer.
#[derive(Debug, Clone, Default)]
pub struct ToastQueue {
    inner: Arc<Mutex<Vec<Toast>>>,
}

impl ToastQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take every pending toast, oldest first.
    #[must_use]
    pub fn drain(&self) -> Vec<Toast> {
        std::mem::take(&mut *self.inner.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Number of pending toasts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Notifier for ToastQueue {
    fn notify(&self, toast: Toast) {
        tracing::debug!(variant = ?toast.variant, "Queued toast");
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(toast);
    }
}
