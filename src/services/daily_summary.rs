//! Daily menu broadcast: builds the summary text for today's menus and posts
//! it to the configured Slack channel.

use chrono::{Datelike, NaiveDateTime};
use serde_json::Value;
use sqlx::PgPool;
use thiserror::Error;
use tracing::info;

use crate::{
    models::menu::{weekday_name, Menu},
    services::{menu::menu_detail_path, menu::MenuService, slack::SlackClient},
};

pub const NO_MENUS_TODAY: &str = "El dia de hoy no hay menus, una disculpa.";
pub const CLOSING_LINE: &str = "Que tengas excelente dia!";

/// Label used when a stored meal-time code has no display name.
const UNKNOWN_MEAL_TIME: &str = "otro horario";

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Slack client could not be built: {0}")]
    Setup(String),
    #[error("could not load today's menus: {0}")]
    Storage(#[from] anyhow::Error),
    #[error("Slack channel '{0}' was not found")]
    ChannelNotFound(String),
    #[error("Slack client misuse: {0}")]
    Client(#[from] crate::services::slack::SlackError),
    #[error("Slack rejected the message: {0}")]
    Rejected(String),
}

/// A summary that Slack accepted.
#[derive(Debug, Clone)]
pub struct Delivered {
    pub channel_id: String,
    pub menu_count: usize,
}

/// Renders the summary for `menus` (already narrowed to today), in input order.
///
/// Menus are grouped by meal time in the order each meal time first appears,
/// and numbered from 1 within their group.
pub fn compose(menus: &[Menu], now: NaiveDateTime, site_domain: &str) -> String {
    if menus.is_empty() {
        return NO_MENUS_TODAY.to_string();
    }

    let weekday = weekday_name(now.weekday().number_from_monday())
        .unwrap_or_default()
        .to_lowercase();
    let mut output = format!("Menu de hoy {weekday}:\n");

    let mut sections: Vec<(String, Vec<&Menu>)> = Vec::new();
    for menu in menus {
        let meal = menu
            .meal()
            .map(|m| m.label())
            .unwrap_or(UNKNOWN_MEAL_TIME)
            .to_lowercase();
        match sections.iter_mut().find(|(name, _)| *name == meal) {
            Some((_, group)) => group.push(menu),
            None => sections.push((meal, vec![menu])),
        }
    }

    for (meal, group) in &sections {
        output.push_str(&format!("Opciones para {meal}:\n"));
        for (i, menu) in group.iter().enumerate() {
            output.push_str(&format!(
                "\t{}. {}. Revisa este menu!: https://{}{}\n",
                i + 1,
                menu.description(),
                site_domain,
                menu_detail_path(menu.id),
            ));
        }
    }

    output.push('\n');
    output.push_str(CLOSING_LINE);
    output
}

/// Resolves `channel_name` and posts `text` there.
pub async fn deliver(
    client: &mut SlackClient,
    channel_name: &str,
    text: &str,
) -> Result<String, DeliveryError> {
    let channel_id = client
        .resolve_channel(channel_name)
        .await
        .ok_or_else(|| DeliveryError::ChannelNotFound(channel_name.to_string()))?;

    let response = client.post_message(&channel_id, text).await?;
    if response.get("ok") == Some(&Value::Bool(true)) {
        Ok(channel_id)
    } else {
        let reason = client
            .last_error()
            .map(str::to_string)
            .unwrap_or_else(|| response.to_string());
        Err(DeliveryError::Rejected(reason))
    }
}

/// Loads today's menus, renders the summary and sends it.
pub async fn send_todays_menu(
    pool: &PgPool,
    client: &mut SlackClient,
    channel_name: &str,
    site_domain: &str,
    now: NaiveDateTime,
) -> Result<Delivered, DeliveryError> {
    let menus = MenuService::list_for_day(pool, now.date()).await?;
    let text = compose(&menus, now, site_domain);
    info!("Daily menu summary for {}:\n{}", now.date(), text);

    let channel_id = deliver(client, channel_name, &text).await?;
    Ok(Delivered {
        channel_id,
        menu_count: menus.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::menu::MealTime;
    use chrono::{NaiveDate, TimeZone, Utc};
    use serde_json::json;
    use uuid::Uuid;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    // 2024-05-22 is a Wednesday.
    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 22)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    fn menu(main: &str, meal: MealTime) -> Menu {
        let at = Utc.with_ymd_and_hms(2024, 5, 22, 13, 0, 0).unwrap();
        Menu {
            id: Uuid::new_v4(),
            main_dish: main.into(),
            side_dish: "Arroz".into(),
            dessert: "Flan".into(),
            preparation_date: at,
            weekday: 3,
            meal_time: meal.code(),
            added_by: None,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn test_compose_without_menus() {
        assert_eq!(compose(&[], now(), "menus.example.com"), NO_MENUS_TODAY);
    }

    #[test]
    fn test_compose_groups_in_first_seen_order() {
        let menus = vec![
            menu("Tacos", MealTime::Lunch),
            menu("Huevos", MealTime::Breakfast),
            menu("Pozole", MealTime::Lunch),
        ];
        let text = compose(&menus, now(), "menus.example.com");

        assert!(text.starts_with("Menu de hoy miercoles:\n"));
        assert!(text.ends_with("\nQue tengas excelente dia!"));
        assert_eq!(text.matches("Opciones para ").count(), 2);

        let lunch = text.find("Opciones para comida:").unwrap();
        let breakfast = text.find("Opciones para desayuno:").unwrap();
        assert!(lunch < breakfast);

        let expected = format!(
            "Menu de hoy miercoles:\n\
             Opciones para comida:\n\
             \t1. Tacos, Arroz y Flan. Revisa este menu!: https://menus.example.com/menus/{}\n\
             \t2. Pozole, Arroz y Flan. Revisa este menu!: https://menus.example.com/menus/{}\n\
             Opciones para desayuno:\n\
             \t1. Huevos, Arroz y Flan. Revisa este menu!: https://menus.example.com/menus/{}\n\
             \n\
             Que tengas excelente dia!",
            menus[0].id, menus[2].id, menus[1].id
        );
        assert_eq!(text, expected);
    }

    #[test]
    fn test_compose_unknown_meal_time_code() {
        let mut odd = menu("Sopa", MealTime::Dinner);
        odd.meal_time = 9;
        let text = compose(&[odd], now(), "menus.example.com");
        assert!(text.contains("Opciones para otro horario:\n\t1. Sopa"));
    }

    #[tokio::test]
    async fn test_deliver_posts_to_resolved_channel() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/conversations.list"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "channels": [{ "id": "C7", "name": "menus" }]
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat.postMessage"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "channel": "C7"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut client = SlackClient::new("xoxb-test", format!("{}/", server.uri()));
        let channel = deliver(&mut client, "menus", "hola").await.unwrap();
        assert_eq!(channel, "C7");
    }

    #[tokio::test]
    async fn test_deliver_missing_channel_does_not_post() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/conversations.list"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "ok": true, "channels": [] })),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat.postMessage"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
            .expect(0)
            .mount(&server)
            .await;

        let mut client = SlackClient::new("xoxb-test", format!("{}/", server.uri()));
        let err = deliver(&mut client, "menus", "hola").await.unwrap_err();
        assert!(matches!(err, DeliveryError::ChannelNotFound(name) if name == "menus"));
    }

    #[tokio::test]
    async fn test_deliver_reports_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/conversations.list"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "channels": [{ "id": "C7", "name": "menus" }]
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat.postMessage"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "ok": false, "error": "not_in_channel" })),
            )
            .mount(&server)
            .await;

        let mut client = SlackClient::new("xoxb-test", format!("{}/", server.uri()));
        let err = deliver(&mut client, "menus", "hola").await.unwrap_err();
        assert!(matches!(err, DeliveryError::Rejected(reason) if reason == "not_in_channel"));
        assert_eq!(client.request_errors(), 1);
    }
}
