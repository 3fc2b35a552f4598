use ratatui::layout::Rect;
use ratatui::widgets::ListState;
use tracing::warn;

use crate::controller::ConversationController;
use crate::gateway::GatewayEvent;
use crate::links::{self, SITE_LINKS};
use crate::model::ModelOption;
use crate::tips::TipRotator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Chat,
    Input,
    Sidebar,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub focus: FocusPane,
    pub controller: ConversationController,

    // Draft editing (cursor counted in chars)
    pub cursor: usize,

    // Chat view state
    pub chat_scroll: u16,
    pub chat_height: u16, // Inner height of chat area for scroll calculations
    pub chat_width: u16,  // Inner width of chat area for wrap calculations
    pub chat_lines: usize, // Wrapped line total from the last render
    pub stick_to_bottom: bool, // Pin the view to the newest line on next render

    // Animation state
    pub animation_frame: u8, // 0-2 for the typing indicator
    pub tips: TipRotator,

    // Sidebar
    pub link_state: ListState,

    // Model picker state
    pub show_model_picker: bool,
    pub model_picker_state: ListState,

    // Panel areas for mouse hit-testing (updated during render)
    pub chat_area: Option<Rect>,
    pub sidebar_area: Option<Rect>,
}

impl App {
    pub fn new(controller: ConversationController) -> Self {
        let mut link_state = ListState::default();
        link_state.select(Some(0));

        Self {
            should_quit: false,
            input_mode: InputMode::Editing,
            focus: FocusPane::Input,
            controller,

            cursor: 0,

            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            chat_lines: 0,
            stick_to_bottom: true,

            animation_frame: 0,
            tips: TipRotator::default(),

            link_state,

            show_model_picker: false,
            model_picker_state: ListState::default(),

            chat_area: None,
            sidebar_area: None,
        }
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.controller.is_loading() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn rotate_tip(&mut self) {
        self.tips.rotate();
    }

    pub fn on_gateway_event(&mut self, event: GatewayEvent) {
        self.controller.apply_gateway_event(event);
        self.follow_latest();
    }

    /// Scroll to the newest content if the controller asked for it.
    pub fn follow_latest(&mut self) {
        if self.controller.take_scroll_request() {
            self.scroll_chat_to_bottom();
        }
    }

    pub fn submit_draft(&mut self) {
        let text = self.controller.draft().to_string();
        if self.controller.submit(&text).is_ok() {
            self.cursor = 0;
            self.follow_latest();
        }
    }

    // Draft editing, UTF-8 safe

    pub fn insert_char(&mut self, c: char) {
        let mut draft = self.controller.draft().to_string();
        draft.insert(char_to_byte_index(&draft, self.cursor), c);
        self.controller.change_draft(draft);
        self.cursor += 1;
    }

    pub fn delete_before_cursor(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            self.remove_at_cursor();
        }
    }

    pub fn delete_at_cursor(&mut self) {
        if self.cursor < self.draft_len() {
            self.remove_at_cursor();
        }
    }

    fn remove_at_cursor(&mut self) {
        let mut draft = self.controller.draft().to_string();
        draft.remove(char_to_byte_index(&draft, self.cursor));
        self.controller.change_draft(draft);
    }

    pub fn cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.draft_len());
    }

    pub fn cursor_home(&mut self) {
        self.cursor = 0;
    }

    pub fn cursor_end(&mut self) {
        self.cursor = self.draft_len();
    }

    fn draft_len(&self) -> usize {
        self.controller.draft().chars().count()
    }

    // Focus

    pub fn cycle_focus(&mut self) {
        self.focus = match self.focus {
            FocusPane::Chat => FocusPane::Input,
            FocusPane::Input if self.controller.sidebar_visible() => FocusPane::Sidebar,
            FocusPane::Input | FocusPane::Sidebar => FocusPane::Chat,
        };
    }

    pub fn toggle_sidebar(&mut self) {
        self.controller.toggle_sidebar();
        if !self.controller.sidebar_visible() && self.focus == FocusPane::Sidebar {
            self.focus = FocusPane::Chat;
        }
    }

    // Chat scrolling

    pub fn scroll_down(&mut self, lines: u16) {
        self.stick_to_bottom = false;
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(self.max_scroll());
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.stick_to_bottom = false;
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    pub fn scroll_chat_to_top(&mut self) {
        self.stick_to_bottom = false;
        self.chat_scroll = 0;
    }

    /// The exact offset is resolved by the next render, once the new content
    /// has been wrapped.
    pub fn scroll_chat_to_bottom(&mut self) {
        self.stick_to_bottom = true;
        self.chat_scroll = self.max_scroll();
    }

    /// Record the rendered height of the chat and settle the scroll offset.
    pub fn set_chat_lines(&mut self, lines: usize) {
        self.chat_lines = lines;
        if self.stick_to_bottom {
            self.chat_scroll = self.max_scroll();
            self.stick_to_bottom = false;
        } else {
            self.chat_scroll = self.chat_scroll.min(self.max_scroll());
        }
    }

    fn max_scroll(&self) -> u16 {
        let hidden = self.chat_lines.saturating_sub(self.chat_height as usize);
        hidden.min(u16::MAX as usize) as u16
    }

    // Sidebar links

    pub fn link_nav_down(&mut self) {
        let i = self.link_state.selected().unwrap_or(0);
        self.link_state.select(Some((i + 1).min(SITE_LINKS.len() - 1)));
    }

    pub fn link_nav_up(&mut self) {
        let i = self.link_state.selected().unwrap_or(0);
        self.link_state.select(Some(i.saturating_sub(1)));
    }

    pub fn open_selected_link(&self) {
        if let Some(link) = self.link_state.selected().and_then(|i| SITE_LINKS.get(i)) {
            if let Err(e) = links::open_in_browser(link.url) {
                warn!(url = link.url, error = %e, "could not open link");
            }
        }
    }

    // Model picker

    pub fn open_model_picker(&mut self) {
        let current = ModelOption::all()
            .iter()
            .position(|m| *m == self.controller.selected_model())
            .unwrap_or(0);
        self.model_picker_state.select(Some(current));
        self.show_model_picker = true;
    }

    pub fn model_picker_nav_down(&mut self) {
        let len = ModelOption::all().len();
        let i = self.model_picker_state.selected().unwrap_or(0);
        self.model_picker_state.select(Some((i + 1).min(len - 1)));
    }

    pub fn model_picker_nav_up(&mut self) {
        let i = self.model_picker_state.selected().unwrap_or(0);
        self.model_picker_state.select(Some(i.saturating_sub(1)));
    }

    pub fn confirm_model(&mut self) {
        if let Some(model) = self.model_picker_state.selected().and_then(|i| ModelOption::all().get(i).copied()) {
            self.controller.select_model(model);
        }
        self.show_model_picker = false;
    }
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::gateway::{ChunkSink, GatewayError, InferenceGateway};
    use crate::state::ChatMessage;
    use async_trait::async_trait;
    use std::sync::Arc;

    pub(crate) struct EchoGateway;

    #[async_trait]
    impl InferenceGateway for EchoGateway {
        async fn send(
            &self,
            transcript: &[ChatMessage],
            _model: ModelOption,
            _chunks: &ChunkSink,
        ) -> Result<String, GatewayError> {
            let last = transcript.last().map(|m| m.content.clone()).unwrap_or_default();
            Ok(format!("echo: {}", last))
        }
    }

    pub(crate) fn test_app() -> App {
        App::new(ConversationController::new(Arc::new(EchoGateway)))
    }

    #[test]
    fn test_char_to_byte_index() {
        assert_eq!(char_to_byte_index("héllo", 2), 3);
        assert_eq!(char_to_byte_index("abc", 10), 3);
    }

    #[test]
    fn test_draft_editing_with_multibyte_chars() {
        let mut app = test_app();
        for c in "héllo".chars() {
            app.insert_char(c);
        }
        app.cursor_home();
        app.cursor_right();
        app.delete_at_cursor();
        assert_eq!(app.controller.draft(), "hllo");

        app.cursor_end();
        app.delete_before_cursor();
        assert_eq!(app.controller.draft(), "hll");
        assert_eq!(app.cursor, 3);

        app.cursor_right();
        assert_eq!(app.cursor, 3);
    }

    #[tokio::test]
    async fn test_submit_draft_resets_cursor_and_echoes() {
        let mut app = test_app();
        for c in "What is BIT?".chars() {
            app.insert_char(c);
        }
        app.submit_draft();
        assert_eq!(app.cursor, 0);
        assert_eq!(app.controller.draft(), "");
        assert!(app.controller.is_loading());

        while app.controller.is_loading() {
            let event = app.controller.next_gateway_event().await.unwrap();
            app.on_gateway_event(event);
        }
        let messages = app.controller.messages();
        assert_eq!(messages[1].content, "echo: What is BIT?");
    }

    #[tokio::test]
    async fn test_blank_draft_is_kept() {
        let mut app = test_app();
        app.insert_char(' ');
        app.submit_draft();
        assert_eq!(app.cursor, 1);
        assert!(app.controller.messages().is_empty());
    }

    #[test]
    fn test_focus_cycle_skips_hidden_sidebar() {
        let mut app = test_app();
        assert_eq!(app.focus, FocusPane::Input);
        app.cycle_focus();
        assert_eq!(app.focus, FocusPane::Sidebar);

        app.toggle_sidebar();
        assert_eq!(app.focus, FocusPane::Chat);
        app.cycle_focus();
        app.cycle_focus();
        assert_eq!(app.focus, FocusPane::Chat);
    }

    #[test]
    fn test_link_navigation_is_clamped() {
        let mut app = test_app();
        app.link_nav_up();
        assert_eq!(app.link_state.selected(), Some(0));
        for _ in 0..10 {
            app.link_nav_down();
        }
        assert_eq!(app.link_state.selected(), Some(SITE_LINKS.len() - 1));
    }

    #[test]
    fn test_model_picker_selects_model() {
        let mut app = test_app();
        app.open_model_picker();
        assert_eq!(app.model_picker_state.selected(), Some(2));
        app.model_picker_nav_down();
        app.model_picker_nav_down();
        app.confirm_model();
        assert!(!app.show_model_picker);
        assert_eq!(app.controller.selected_model(), ModelOption::Gemini10Pro);
    }

    #[test]
    fn test_tip_rotation_and_animation() {
        let mut app = test_app();
        app.rotate_tip();
        assert_eq!(app.tips.index(), 1);
        // Animation only runs while loading
        app.tick_animation();
        assert_eq!(app.animation_frame, 0);
    }
}
