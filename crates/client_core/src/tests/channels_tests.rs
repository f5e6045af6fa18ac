use super::*;
use crate::{
    fakes::{channel, harness, FakeBackend, ViewOp},
    selection::{SelectionStore, CURRENT_CHANNEL_ID_KEY, CURRENT_CHANNEL_SLUG_KEY},
};
use shared::domain::{ChannelId, User, UserStatus};

#[tokio::test]
async fn renders_channels_in_backend_order_with_hash_prefix() {
    let backend = FakeBackend::signed_in().with_state(|state| {
        state.channels = vec![channel(1, "general"), channel(2, "random")];
    });
    let h = harness(backend, Page::Channels);
    let controller = ChannelListController::new(h.ctx.clone());

    let loaded = controller.load_channels().await;

    assert_eq!(loaded.len(), 2);
    assert_eq!(
        h.view.rendered_lines(ElementId::ChannelList),
        vec!["# general".to_string(), "# random".to_string()]
    );
    assert_eq!(controller.rows(), loaded);
}

#[tokio::test]
async fn load_failure_keeps_previous_rows_and_shows_no_alert() {
    let backend = FakeBackend::signed_in().with_state(|state| {
        state.channels = vec![channel(1, "general")];
    });
    let h = harness(backend.clone(), Page::Channels);
    let controller = ChannelListController::new(h.ctx.clone());
    controller.load_channels().await;

    backend.state.lock().expect("state").list_channels_failure = Some("boom".into());
    let rows = controller.load_channels().await;

    assert_eq!(rows, vec![channel(1, "general")]);
    assert!(h.view.alerts().is_empty());
    let replacements = h
        .view
        .ops()
        .into_iter()
        .filter(|op| matches!(op, ViewOp::Replace(ElementId::ChannelList, _)))
        .count();
    assert_eq!(replacements, 1);
}

#[tokio::test]
async fn page_without_channel_list_skips_fetch() {
    let h = harness(FakeBackend::signed_in(), Page::Login);
    let controller = ChannelListController::new(h.ctx.clone());

    assert!(controller.load_channels().await.is_empty());
    assert_eq!(h.backend.call_count("list_channels"), 0);
}

#[tokio::test]
async fn selecting_a_row_persists_selection_and_opens_chat() {
    let backend = FakeBackend::signed_in().with_state(|state| {
        state.channels = vec![channel(1, "general"), channel(2, "random")];
    });
    let h = harness(backend, Page::Channels);
    let controller = ChannelListController::new(h.ctx.clone());
    controller.load_channels().await;

    assert!(controller.select_row(1));
    assert_eq!(h.selection.get(CURRENT_CHANNEL_ID_KEY).as_deref(), Some("2"));
    assert_eq!(h.selection.get(CURRENT_CHANNEL_SLUG_KEY).as_deref(), Some("random"));
    assert_eq!(h.view.navigations(), vec![Page::Chat]);

    assert!(!controller.select_row(5));
}

#[tokio::test]
async fn empty_name_alerts_without_backend_call() {
    let h = harness(FakeBackend::signed_in(), Page::Channels);
    let controller = ChannelListController::new(h.ctx.clone());

    assert!(controller.create_channel("   ").await.is_none());
    assert!(controller.create_channel("#").await.is_none());

    assert_eq!(
        h.view.alerts(),
        vec![EMPTY_CHANNEL_NAME_ALERT.to_string(), EMPTY_CHANNEL_NAME_ALERT.to_string()]
    );
    assert!(h.backend.calls().is_empty());
}

#[tokio::test]
async fn created_channel_becomes_the_selection() {
    let h = harness(FakeBackend::signed_in(), Page::Channels);
    let controller = ChannelListController::new(h.ctx.clone());

    let created = controller
        .create_channel("  My Room  ")
        .await
        .expect("channel created");

    assert_eq!(created.slug, "my-room");
    let stored = Selection::load(h.selection.as_ref()).expect("selection");
    assert_eq!(stored.channel_id, created.id);
    assert_eq!(stored.slug.as_deref(), Some("my-room"));

    let state = h.backend.state.lock().expect("state");
    assert_eq!(state.created_channels.len(), 1);
    assert_eq!(
        state.created_channels[0].created_by,
        crate::fakes::test_user().id
    );
    drop(state);

    let ops = h.view.ops();
    assert!(ops.contains(&ViewOp::ClearInput(ElementId::ChannelName)));
    assert_eq!(ops.last(), Some(&ViewOp::Navigate(Page::Chat)));
}

#[tokio::test]
async fn create_failure_alerts_backend_message_verbatim() {
    let backend = FakeBackend::signed_in().with_state(|state| {
        state.create_channel_failure =
            Some("duplicate key value violates unique constraint \"channels_slug_key\"".into());
    });
    let h = harness(backend, Page::Channels);
    let controller = ChannelListController::new(h.ctx.clone());

    assert!(controller.create_channel("general").await.is_none());
    assert_eq!(
        h.view.alerts(),
        vec!["duplicate key value violates unique constraint \"channels_slug_key\"".to_string()]
    );
    assert!(Selection::load(h.selection.as_ref()).is_none());
    assert!(h.view.navigations().is_empty());
}

#[tokio::test]
async fn create_without_session_redirects_to_login() {
    let h = harness(FakeBackend::signed_out(), Page::Channels);
    let controller = ChannelListController::new(h.ctx.clone());

    assert!(controller.create_channel("general").await.is_none());
    assert_eq!(h.view.navigations(), vec![Page::Login]);
    assert_eq!(h.backend.call_count("create_channel"), 0);
}

#[tokio::test]
async fn sidebar_marks_user_online_and_shows_username() {
    let backend = FakeBackend::signed_in().with_state(|state| {
        state.profile = Some(User {
            username: Some("ana".into()),
            ..User::default()
        });
        state.channels = vec![channel(1, "general")];
    });
    let h = harness(backend, Page::Channels);
    let controller = ChannelListController::new(h.ctx.clone());

    let user = controller.init_sidebar().await.expect("signed in");

    assert_eq!(h.view.text(ElementId::UsernameDisplay).as_deref(), Some("ana"));
    assert_eq!(h.view.rendered_lines(ElementId::ChannelList), vec!["# general"]);
    let state = h.backend.state.lock().expect("state");
    assert_eq!(state.status_updates, vec![(user.id, UserStatus::Online)]);
}

#[tokio::test]
async fn sidebar_falls_back_to_email_and_tolerates_status_failure() {
    let backend = FakeBackend::signed_in().with_state(|state| {
        state.status_update_fails = true;
    });
    let h = harness(backend, Page::Channels);
    let controller = ChannelListController::new(h.ctx.clone());

    assert!(controller.init_sidebar().await.is_some());
    assert_eq!(
        h.view.text(ElementId::UsernameDisplay).as_deref(),
        Some("ana@example.com")
    );
    assert_eq!(h.backend.call_count("list_channels"), 1);
}

#[tokio::test]
async fn sidebar_without_session_redirects_and_stops() {
    let h = harness(FakeBackend::signed_out(), Page::Channels);
    let controller = ChannelListController::new(h.ctx.clone());

    assert!(controller.init_sidebar().await.is_none());
    assert_eq!(h.view.navigations(), vec![Page::Login]);
    assert_eq!(h.backend.calls(), vec!["current_user"]);
}

#[tokio::test]
async fn chat_page_sidebar_switches_channel() {
    let backend = FakeBackend::signed_in().with_state(|state| {
        state.channels = vec![channel(1, "general"), channel(2, "random")];
    });
    let h = harness(backend, Page::Chat);
    Selection::save(h.selection.as_ref(), ChannelId(1), "general").expect("select");
    let controller = ChannelListController::new(h.ctx.clone());
    controller.init_sidebar().await.expect("signed in");

    assert!(controller.select_row(1));
    let stored = Selection::load(h.selection.as_ref()).expect("selection");
    assert_eq!(stored.channel_id, ChannelId(2));
    assert_eq!(stored.slug.as_deref(), Some("random"));
    assert_eq!(h.view.navigations(), vec![Page::Chat]);
}
