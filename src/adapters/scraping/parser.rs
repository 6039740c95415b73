//! HTML extraction for the game site's pages.
//!
//! Every function here is pure: a page goes in, typed facts come out. Missing or
//! malformed elements yield an empty list or `false` plus a log line, never an
//! error, because the markup is not under our control.

use crate::domain::model::{Message, MessageId};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;
use url::Url;

const LOGIN_MARKERS: [&str; 3] = ["Identifiant", "S'identifier", "c[1]"];

static BELL_ICON: LazyLock<Selector> = LazyLock::new(|| selector("i.fa-bell"));
static ACCOUNT_LINKS: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"div[class*="list-group"] a[href*="kramail/"]"#));
static HEADING: LazyLock<Selector> = LazyLock::new(|| selector("h1"));
static TABLE_ROWS: LazyLock<Selector> = LazyLock::new(|| selector("table tbody tr"));
static UNREAD_LINK: LazyLock<Selector> = LazyLock::new(|| selector("strong a, b a"));
static CHECKBOX: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"input[type="checkbox"]"#));
static HIDDEN_TITLE: LazyLock<Selector> = LazyLock::new(|| selector("span.invisible"));
static LINK: LazyLock<Selector> = LazyLock::new(|| selector("a"));

fn selector(css: &str) -> Selector {
    // 常數選擇器，解析失敗屬於程式錯誤
    Selector::parse(css).expect("static CSS selector must be valid")
}

/// 側欄中的一個帳號連結
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountLink {
    pub name: String,
    pub url: String,
    pub section: String,
}

pub fn requires_authentication(html: &str) -> bool {
    LOGIN_MARKERS.iter().any(|marker| html.contains(marker))
}

/// True only when a bell icon is directly followed by a badge reading exactly
/// `!`. The same bell carries numeric badges for other counters.
pub fn has_general_notification(html: &str) -> bool {
    let document = Html::parse_document(html);

    let found = document.select(&BELL_ICON).any(|icon| {
        next_element_sibling(icon).is_some_and(|badge| {
            has_class(badge, "badge") && element_text(badge) == "!"
        })
    });

    tracing::debug!("General notification badge present: {}", found);
    found
}

pub fn extract_accounts(html: &str, base_url: &Url) -> Vec<AccountLink> {
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut accounts = Vec::new();

    for link in document.select(&ACCOUNT_LINKS) {
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        if href.contains("post/") {
            continue;
        }

        let url = match resolve_link(base_url, href) {
            Some(url) => url,
            None => {
                tracing::warn!("Skipping account link with invalid href: {}", href);
                continue;
            }
        };
        if !seen.insert(url.clone()) {
            continue;
        }

        let name = own_text(link);
        let section = if href.to_lowercase().contains("joyeux") {
            "plateau"
        } else {
            "membre"
        };

        tracing::debug!("Found account: {} ({}) at {}", name, section, url);
        accounts.push(AccountLink {
            name,
            url,
            section: section.to_string(),
        });
    }

    accounts
}

/// Unread rows only: the site marks them with a bold subject link.
pub fn parse_messages(html: &str, section: &str) -> Vec<Message> {
    let document = Html::parse_document(html);

    let Some(heading) = document.select(&HEADING).next() else {
        tracing::warn!("No h1 found, cannot determine recipient");
        return Vec::new();
    };

    let recipient = match own_text(heading) {
        text if text.is_empty() => element_text(heading),
        text => text,
    };

    let mut messages = Vec::new();

    for row in document.select(&TABLE_ROWS) {
        let cells: Vec<ElementRef<'_>> = row
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|child| child.value().name() == "td")
            .collect();
        if cells.len() < 4 {
            continue;
        }

        let Some(unread_link) = cells[1].select(&UNREAD_LINK).next() else {
            continue;
        };

        let id = cells[0]
            .select(&CHECKBOX)
            .next()
            .and_then(|input| input.value().attr("value"))
            .unwrap_or_default()
            .trim()
            .to_string();

        let title = match cells[1].select(&HIDDEN_TITLE).next().map(element_text) {
            Some(title) if !title.is_empty() => title,
            _ => element_text(unread_link),
        };

        let sender = match cells[2].select(&LINK).next().map(element_text) {
            Some(sender) if !sender.is_empty() => sender,
            _ => element_text(cells[2]),
        };

        if title.is_empty() {
            tracing::debug!("Skipping unread row without title (id={:?})", id);
            continue;
        }
        let Ok(message_id) = MessageId::new(id) else {
            tracing::debug!("Skipping unread row without id (title={:?})", title);
            continue;
        };

        tracing::debug!(
            "Found unread message: id={}, title={}, from={}, to={}, section={}",
            message_id,
            title,
            sender,
            recipient,
            section
        );
        messages.push(Message {
            id: message_id,
            title,
            sender,
            recipient: recipient.clone(),
            section: section.to_string(),
        });
    }

    messages
}

/// The same action link is shown greyed out once used; only the `btn-primary`
/// variant means the action is still available.
pub fn is_reminder_available(html: &str, action_label: &str) -> bool {
    let document = Html::parse_document(html);

    document.select(&LINK).any(|link| {
        element_text(link).contains(action_label) && has_class(link, "btn-primary")
    })
}

fn next_element_sibling(element: ElementRef<'_>) -> Option<ElementRef<'_>> {
    element.next_siblings().find_map(ElementRef::wrap)
}

fn has_class(element: ElementRef<'_>, class: &str) -> bool {
    element.value().classes().any(|c| c == class)
}

fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// 只取元素本身的文字節點，不含子元素
fn own_text(element: ElementRef<'_>) -> String {
    element
        .children()
        .filter_map(|node| node.value().as_text())
        .flat_map(|text| text.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ")
}

fn resolve_link(base_url: &Url, href: &str) -> Option<String> {
    if href.starts_with("http://") || href.starts_with("https://") {
        return Url::parse(href).ok().map(String::from);
    }
    base_url.join(href).ok().map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bell(badge: &str) -> String {
        format!(
            r#"<ul class="nav navbar-nav navbar-right">
                <li><a href="" onclick="javascript:openReport();return false;"><i class="fa fa-bell"></i>{}</a></li>
            </ul>"#,
            badge
        )
    }

    #[test]
    fn test_general_notification_with_exclamation_badge() {
        assert!(has_general_notification(&bell(
            r#"<span class="badge badge-danger">!</span>"#
        )));
    }

    #[test]
    fn test_general_notification_with_empty_badge() {
        assert!(!has_general_notification(&bell(
            r#"<span class="badge badge-danger"></span>"#
        )));
    }

    #[test]
    fn test_general_notification_with_count_badge() {
        assert!(!has_general_notification(&bell(
            r#"<span class="badge badge-danger">5</span>"#
        )));
    }

    #[test]
    fn test_general_notification_without_badge() {
        assert!(!has_general_notification(&bell("")));
    }

    #[test]
    fn test_general_notification_without_bell_icon() {
        let html = r##"<ul><li><a href="#"><span class="badge badge-danger">!</span></a></li></ul>"##;
        assert!(!has_general_notification(html));
    }

    #[test]
    fn test_general_notification_tolerates_whitespace() {
        assert!(has_general_notification(&bell(
            "\n  <span class=\"badge badge-danger\">  !  </span>"
        )));
    }

    #[test]
    fn test_requires_authentication() {
        assert!(requires_authentication(
            r#"<form><input name="c[1]"><button>S'identifier</button></form>"#
        ));
        assert!(requires_authentication("<label>Identifiant</label>"));
        assert!(!requires_authentication("<h1>Kramails</h1>"));
    }

    const SIDEBAR: &str = r#"
        <div class="list-group">
            <span class="list-group-item active">Comptes</span>
            <a href="kramail/membre-1234" class="list-group-item">Alice <span class="badge">2</span></a>
            <a href="kramail/post/membre-1234" class="list-group-item">Écrire</a>
            <a href="http://www.kraland.org/kramail/thanael-le-joyeux" class="list-group-item">Thanaël le Joyeux</a>
            <a href="kramail/membre-1234" class="list-group-item">Alice</a>
            <a href="forum/general" class="list-group-item">Forum</a>
        </div>
        <div class="other"><a href="kramail/outside">Outside</a></div>
    "#;

    #[test]
    fn test_extract_accounts() {
        let base = Url::parse("http://www.kraland.org/").unwrap();
        let accounts = extract_accounts(SIDEBAR, &base);

        assert_eq!(accounts.len(), 2);
        assert_eq!(
            accounts[0],
            AccountLink {
                name: "Alice".to_string(),
                url: "http://www.kraland.org/kramail/membre-1234".to_string(),
                section: "membre".to_string(),
            }
        );
        assert_eq!(accounts[1].name, "Thanaël le Joyeux");
        assert_eq!(accounts[1].section, "plateau");
    }

    #[test]
    fn test_extract_accounts_without_sidebar() {
        let base = Url::parse("http://www.kraland.org/").unwrap();
        assert!(extract_accounts("<p>nothing</p>", &base).is_empty());
    }

    const INBOX: &str = r#"
        <h1>Alice <small>boîte de réception</small></h1>
        <table class="table">
            <thead><tr><th></th><th>Sujet</th><th>De</th><th>Date</th></tr></thead>
            <tbody>
                <tr>
                    <td><input type="checkbox" name="k[]" value="1001"></td>
                    <td><strong><a href="kramail/1001">Rendez-vous</a></strong><span class="invisible">Rendez-vous à la taverne</span></td>
                    <td><a href="perso/bob">Bob</a></td>
                    <td>05 jan</td>
                </tr>
                <tr>
                    <td><input type="checkbox" name="k[]" value="1002"></td>
                    <td><a href="kramail/1002">Déjà lu</a><span class="invisible">Déjà lu</span></td>
                    <td><a href="perso/carol">Carol</a></td>
                    <td>04 jan</td>
                </tr>
                <tr>
                    <td><input type="checkbox" name="k[]" value="1003"></td>
                    <td><strong><a href="kramail/1003">Sans titre caché</a></strong></td>
                    <td>Système</td>
                    <td>03 jan</td>
                </tr>
                <tr>
                    <td><input type="checkbox" name="k[]" value=""></td>
                    <td><strong><a href="kramail/x">Sans id</a></strong></td>
                    <td><a href="perso/dave">Dave</a></td>
                    <td>02 jan</td>
                </tr>
                <tr><td colspan="4">Page 1/1</td></tr>
            </tbody>
        </table>
    "#;

    #[test]
    fn test_parse_messages_keeps_unread_rows() {
        let messages = parse_messages(INBOX, "membre");

        assert_eq!(messages.len(), 2);

        assert_eq!(messages[0].id.as_str(), "1001");
        assert_eq!(messages[0].title, "Rendez-vous à la taverne");
        assert_eq!(messages[0].sender, "Bob");
        assert_eq!(messages[0].recipient, "Alice");
        assert_eq!(messages[0].section, "membre");

        assert_eq!(messages[1].id.as_str(), "1003");
        assert_eq!(messages[1].title, "Sans titre caché");
        assert_eq!(messages[1].sender, "Système");
    }

    #[test]
    fn test_parse_messages_without_heading_is_empty() {
        let html = INBOX.replace("<h1>Alice <small>boîte de réception</small></h1>", "");
        assert!(parse_messages(&html, "membre").is_empty());
    }

    #[test]
    fn test_parse_messages_without_table_is_empty() {
        assert!(parse_messages("<h1>Alice</h1><p>Aucun message</p>", "membre").is_empty());
    }

    #[test]
    fn test_reminder_available_with_primary_button() {
        let html = r##"<div><a class="btn btn-primary alert11 mini" href="#"><i class="fa fa-bed"></i> Dormir</a>
                      <a class="btn btn-primary alert12 mini" href="#"><i class="fa fa-pray"></i> Prier</a></div>"##;
        assert!(is_reminder_available(html, "Dormir"));
    }

    #[test]
    fn test_reminder_unavailable_with_default_button() {
        let html = r##"<div><a class="btn btn-default alert11 mini" href="#"><i class="fa fa-bed"></i> Dormir</a>
                      <a class="btn btn-primary alert12 mini" href="#"><i class="fa fa-pray"></i> Prier</a></div>"##;
        assert!(!is_reminder_available(html, "Dormir"));
    }

    #[test]
    fn test_reminder_unavailable_without_link() {
        assert!(!is_reminder_available("<p>Dormir</p>", "Dormir"));
    }
}
