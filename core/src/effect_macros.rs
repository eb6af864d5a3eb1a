//! Declarative macros for effect construction.
//!
//! Reducers describe persistence as effects; these macros hide the
//! `Box::pin(async move { .. })` plumbing.

/// Create an `Effect::Future` that appends events to an event store.
///
/// # Example
///
/// ```rust,ignore
/// use campus_core::append_events;
///
/// append_events! {
///     store: env.event_store,
///     stream: env.stream_id.clone(),
///     events: vec![serialized_event],
///     on_success: |_version| None,
///     on_error: |error| Some(RegistrationAction::PersistenceFailed { error: error.to_string() })
/// }
/// ```
#[macro_export]
macro_rules! append_events {
    (
        store: $store:expr,
        stream: $stream:expr,
        events: $events:expr,
        on_success: |$success_param:ident| $success_body:expr,
        on_error: |$error_param:ident| $error_body:expr
    ) => {{
        let event_store = ::std::sync::Arc::clone(&$store);
        let stream_id = $stream;
        let events = $events;
        $crate::effect::Effect::Future(::std::boxed::Box::pin(async move {
            match event_store.append_events(stream_id, events).await {
                Ok($success_param) => $success_body,
                Err($error_param) => $error_body,
            }
        }))
    }};
}

/// Create an `Effect::Future` from an async block
///
/// # Example
///
/// ```rust,ignore
/// use campus_core::async_effect;
///
/// async_effect! {
///     notify_coordinator(&event_id).await;
///     None
/// }
/// ```
#[macro_export]
macro_rules! async_effect {
    ($($body:tt)*) => {
        $crate::effect::Effect::Future(
            ::std::boxed::Box::pin(async move { $($body)* })
        )
    };
}
