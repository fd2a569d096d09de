use ratatui::layout::Rect;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::RequestError;
use crate::session::Session;
use crate::tickets::{TicketClient, TicketReceipt};
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub struct App {
    pub should_quit: bool,
    pub session: Session,
    client: TicketClient,
    replies: UnboundedSender<AppEvent>,

    // Input state
    pub cursor: usize, // cursor position in the pending input, in chars
    pub in_flight: usize,

    // Chat view state
    pub chat_scroll: u16,
    pub chat_height: u16, // Height of chat area for scroll calculations
    pub chat_width: u16,  // Width of chat area for wrap calculations
    pub animation_frame: u8,

    // Panel areas for mouse hit-testing (updated during render)
    pub chat_area: Option<Rect>,
    pub send_area: Option<Rect>,
}

impl App {
    pub fn new(client: TicketClient, replies: UnboundedSender<AppEvent>) -> Self {
        Self {
            should_quit: false,
            session: Session::new(),
            client,
            replies,
            cursor: 0,
            in_flight: 0,
            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            animation_frame: 0,
            chat_area: None,
            send_area: None,
        }
    }

    pub fn endpoint(&self) -> &str {
        self.client.url()
    }

    /// Start a submit cycle. The user's message lands immediately; the ticket
    /// request runs on its own task and reports back as [`AppEvent::Reply`].
    /// Earlier requests may still be pending.
    pub fn submit(&mut self) -> Option<JoinHandle<()>> {
        let text = self.session.begin_submit()?;

        self.in_flight += 1;
        self.scroll_to_bottom();

        let client = self.client.clone();
        let replies = self.replies.clone();
        Some(tokio::spawn(async move {
            let outcome = client.create_ticket(&text).await;
            // Receiver is gone once the app has quit; the reply is dropped.
            if replies.send(AppEvent::Reply(outcome)).is_err() {
                debug!("reply arrived after shutdown");
            }
        }))
    }

    pub fn on_reply(&mut self, outcome: Result<TicketReceipt, RequestError>) {
        self.in_flight = self.in_flight.saturating_sub(1);
        self.session.finish_submit(outcome);
        self.cursor = 0;
        self.scroll_to_bottom();
    }

    pub fn insert_char(&mut self, c: char) {
        let mut input = self.session.pending_input().to_string();
        let byte_pos = char_to_byte_index(&input, self.cursor);
        input.insert(byte_pos, c);
        self.session.set_pending_input(input);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            self.remove_at_cursor();
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.input_len() {
            self.remove_at_cursor();
        }
    }

    fn remove_at_cursor(&mut self) {
        let mut input = self.session.pending_input().to_string();
        let byte_pos = char_to_byte_index(&input, self.cursor);
        input.remove(byte_pos);
        self.session.set_pending_input(input);
    }

    fn input_len(&self) -> usize {
        self.session.pending_input().chars().count()
    }

    pub fn cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.input_len());
    }

    pub fn cursor_home(&mut self) {
        self.cursor = 0;
    }

    pub fn cursor_end(&mut self) {
        self.cursor = self.input_len();
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.in_flight > 0 {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(self.max_scroll());
    }

    pub fn scroll_to_bottom(&mut self) {
        self.chat_scroll = self.max_scroll();
    }

    fn max_scroll(&self) -> u16 {
        let visible_height = if self.chat_height > 0 { self.chat_height } else { 20 };
        self.total_chat_lines().saturating_sub(visible_height)
    }

    /// Estimate wrapped line count of the chat transcript, matching the layout in `ui`.
    fn total_chat_lines(&self) -> u16 {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 { self.chat_width as usize } else { 50 };

        let mut total_lines: usize = 0;
        for msg in self.session.messages() {
            total_lines += 1; // Sender line
            for line in msg.text.lines() {
                // Empty line still takes one line
                total_lines += line.chars().count() / wrap_width + 1;
            }
            total_lines += 1; // Blank line after message
        }

        if self.in_flight > 0 {
            total_lines += 2; // "Bot:" + "Filing ticket..."
        }
        u16::try_from(total_lines).unwrap_or(u16::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::session::{Message, FAILURE_TEXT};
    use serde_json::json;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn app_with(url: &str) -> (App, mpsc::UnboundedReceiver<AppEvent>) {
        let mut config = Config::default();
        config.set_base_url(url);
        let (tx, rx) = mpsc::unbounded_channel();
        (App::new(TicketClient::new(&config), tx), rx)
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            app.insert_char(c);
        }
    }

    #[test]
    fn editing_is_utf8_safe() {
        let (mut app, _rx) = app_with("http://127.0.0.1:1");
        type_text(&mut app, "café");
        app.cursor_left();
        app.backspace();
        assert_eq!(app.session.pending_input(), "caé");

        app.cursor_home();
        app.delete();
        app.insert_char('ñ');
        assert_eq!(app.session.pending_input(), "ñaé");
        assert_eq!(app.cursor, 1);

        app.cursor_end();
        assert_eq!(app.cursor, 3);
        app.cursor_right();
        assert_eq!(app.cursor, 3);
    }

    #[tokio::test]
    async fn blank_submit_spawns_nothing() {
        let (mut app, _rx) = app_with("http://127.0.0.1:1");
        type_text(&mut app, "  ");
        assert!(app.submit().is_none());
        assert_eq!(app.in_flight, 0);
        assert_eq!(app.session.messages().len(), 1);
        assert_eq!(app.session.pending_input(), "  ");
    }

    #[tokio::test]
    async fn reply_arrives_through_event_channel() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 5, "assigned_team": "IT Team", "status": "OPEN"
            })))
            .mount(&server)
            .await;
        let (mut app, mut rx) = app_with(&server.uri());
        type_text(&mut app, "VPN keeps dropping");

        app.submit();
        assert_eq!(app.in_flight, 1);
        assert_eq!(app.session.messages().last(), Some(&Message::user("VPN keeps dropping")));

        match rx.recv().await {
            Some(AppEvent::Reply(outcome)) => app.on_reply(outcome),
            other => panic!("unexpected event: {:?}", other),
        }

        assert_eq!(app.in_flight, 0);
        assert_eq!(app.cursor, 0);
        assert_eq!(app.session.pending_input(), "");
        let reply = &app.session.messages()[2].text;
        assert!(reply.contains("#5"));
        assert!(reply.contains("IT Team"));
    }

    #[tokio::test]
    async fn overlapping_submits_each_get_a_reply() {
        let (mut app, mut rx) = app_with("http://127.0.0.1:1");
        type_text(&mut app, "one");
        app.submit();
        app.session.set_pending_input("two");
        app.submit();
        assert_eq!(app.in_flight, 2);

        for _ in 0..2 {
            match rx.recv().await {
                Some(AppEvent::Reply(outcome)) => app.on_reply(outcome),
                other => panic!("unexpected event: {:?}", other),
            }
        }

        let texts: Vec<&str> = app.session.messages().iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts.len(), 5);
        assert_eq!(&texts[1..3], &["one", "two"]);
        assert_eq!(&texts[3..], &[FAILURE_TEXT, FAILURE_TEXT]);
        assert_eq!(app.in_flight, 0);
    }

    #[tokio::test]
    async fn reply_after_shutdown_is_dropped() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "id": 9 }))
                    .set_delay(Duration::from_millis(200)),
            )
            .expect(1)
            .mount(&server)
            .await;
        let (mut app, rx) = app_with(&server.uri());
        type_text(&mut app, "elevator stuck");

        let task = app.submit().expect("request task");
        drop(rx);

        assert!(task.await.is_ok());
        assert_eq!(app.session.messages().len(), 2);
        assert_eq!(app.session.messages()[1], Message::user("elevator stuck"));
        assert_eq!(app.in_flight, 1);
    }

    #[test]
    fn scrolling_is_clamped() {
        let (mut app, _rx) = app_with("http://127.0.0.1:1");
        app.chat_height = 2;
        app.chat_width = 40;
        app.scroll_down(100);
        // Greeting: sender line + text line + blank line
        assert_eq!(app.chat_scroll, 1);
        app.scroll_up(5);
        assert_eq!(app.chat_scroll, 0);
    }
}
