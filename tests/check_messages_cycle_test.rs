use httpmock::prelude::*;
use krabot_notif::adapters::{
    DiscordNotifier, InMemoryStateStore, KralandScraper, NotificationTemplates, WebhookClient,
};
use krabot_notif::app::CheckMessages;
use krabot_notif::config::toml_config::SiteConfig;
use krabot_notif::domain::model::{Account, ReleaseVersion};
use krabot_notif::domain::ports::StateRepository;
use std::sync::Arc;
use std::time::Duration;

const INDEX_PAGE: &str = r#"<html><body>
    <i class="fa fa-bell"></i><span class="badge">!</span>
    <div class="list-group">
        <a href="kramail/membre-1" class="list-group-item">Alice</a>
    </div>
</body></html>"#;

const INBOX: &str = r#"<html><body><h1>Alice</h1><table><tbody>
    <tr><td><input type="checkbox" value="11"></td>
        <td><strong><a href="kramail/11">Rendez-vous</a></strong><span class="invisible">Rendez-vous</span></td>
        <td><a href="perso/bob">Bob</a></td><td>hier</td></tr>
    <tr><td><input type="checkbox" value="12"></td>
        <td><strong><a href="kramail/12">Ravitaillement</a></strong><span class="invisible">Ravitaillement</span></td>
        <td><a href="perso/carol">Carol</a></td><td>hier</td></tr>
</tbody></table></body></html>"#;

struct Stack {
    use_case: CheckMessages,
    state: Arc<InMemoryStateStore>,
}

fn stack(site: &MockServer, discord: &MockServer) -> Stack {
    let scraper = KralandScraper::new(&SiteConfig {
        base_url: Some(site.base_url()),
        timeout_seconds: Some(5),
        ..Default::default()
    })
    .unwrap();
    let webhook = WebhookClient::new(
        discord.url("/hook"),
        "Krabot",
        "http://img.kraland.org/a/krabot.jpg",
        Duration::from_secs(5),
    )
    .unwrap();
    let notifier = DiscordNotifier::new(
        webhook,
        NotificationTemplates::default(),
        "https://example.org/releases",
    );
    let state = Arc::new(InMemoryStateStore::new(ReleaseVersion::from_build("1.0.0")));

    let use_case = CheckMessages::new(
        Arc::new(scraper),
        Arc::new(notifier),
        state.clone(),
        Account::new("alice", "secret").unwrap(),
    );
    Stack { use_case, state }
}

#[tokio::test]
async fn test_cycle_notifies_each_event_once() {
    let site = MockServer::start();
    let discord = MockServer::start();

    site.mock(|when, then| {
        when.method(GET).path("/kramail");
        then.status(200).body(INDEX_PAGE);
    });
    site.mock(|when, then| {
        when.method(GET).path("/kramail/membre-1");
        then.status(200).body(INBOX);
    });

    let general = discord.mock(|when, then| {
        when.method(POST)
            .path("/hook")
            .body_contains("Hey, tu as une notification !!");
        then.status(204);
    });
    let first = discord.mock(|when, then| {
        when.method(POST).path("/hook").body_contains("'Rendez-vous'");
        then.status(204);
    });
    let second = discord.mock(|when, then| {
        when.method(POST).path("/hook").body_contains("'Ravitaillement'");
        then.status(204);
    });

    let stack = stack(&site, &discord);

    stack.use_case.execute().await.unwrap();
    stack.use_case.execute().await.unwrap();

    general.assert_hits(1);
    first.assert_hits(1);
    second.assert_hits(1);

    let snapshot = stack.state.snapshot();
    assert_eq!(snapshot.message_count, 2);
    assert!(snapshot.has_notification);
    assert!(stack.state.is_general_notification_sent());
    assert_eq!(stack.state.notified_count(), 2);
}

#[tokio::test]
async fn test_cycle_holds_back_while_webhook_cools_down() {
    let site = MockServer::start();
    let discord = MockServer::start();

    site.mock(|when, then| {
        when.method(GET).path("/kramail");
        then.status(200).body(INDEX_PAGE);
    });
    site.mock(|when, then| {
        when.method(GET).path("/kramail/membre-1");
        then.status(200).body(INBOX);
    });

    let reset = chrono::Utc::now().timestamp() + 60;
    let hook = discord.mock(|when, then| {
        when.method(POST).path("/hook");
        then.status(204)
            .header("x-ratelimit-remaining", "0")
            .header("x-ratelimit-reset", reset.to_string());
    });

    let stack = stack(&site, &discord);
    stack.use_case.execute().await.unwrap();

    // 第一次送出後即進入冷卻
    hook.assert_hits(1);
    assert!(stack.state.is_general_notification_sent());
    assert_eq!(stack.state.notified_count(), 0);
    assert_eq!(stack.state.snapshot().message_count, 2);
}

#[tokio::test]
async fn test_cycle_fails_after_three_attempts() {
    let site = MockServer::start();
    let discord = MockServer::start();

    let index = site.mock(|when, then| {
        when.method(GET).path("/kramail");
        then.status(503);
    });
    let hook = discord.mock(|when, then| {
        when.method(POST).path("/hook");
        then.status(204);
    });

    let stack = stack(&site, &discord);
    let result = stack.use_case.execute().await;

    assert!(result.is_err());
    // 每次嘗試：驗證頁 + 索引頁
    index.assert_hits(6);
    hook.assert_hits(0);
}
