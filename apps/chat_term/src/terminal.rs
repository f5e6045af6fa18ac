//! `View` that prints the page to stdout.

use std::sync::Mutex;

use client_core::{ElementId, Node, Page, View};
use tracing::{debug, info};

struct Screen {
    page: Page,
    pending: Option<Page>,
}

pub struct TerminalView {
    screen: Mutex<Screen>,
}

impl TerminalView {
    pub fn new(page: Page) -> Self {
        Self {
            screen: Mutex::new(Screen {
                page,
                pending: None,
            }),
        }
    }

    pub fn page(&self) -> Page {
        self.screen
            .lock()
            .map(|screen| screen.page)
            .unwrap_or(Page::Login)
    }

    /// Switches to `page` and forgets any navigation requested before it.
    pub fn show(&self, page: Page) {
        if let Ok(mut screen) = self.screen.lock() {
            screen.page = page;
            screen.pending = None;
        }
        println!();
        println!("==== {} ====", page.as_str());
    }

    /// Navigation requested by a controller since the last call.
    pub fn take_navigation(&self) -> Option<Page> {
        self.screen
            .lock()
            .ok()
            .and_then(|mut screen| screen.pending.take())
    }
}

impl View for TerminalView {
    fn has_element(&self, element: ElementId) -> bool {
        self.page().elements().contains(&element)
    }

    fn set_text(&self, element: ElementId, text: &str) {
        match element {
            ElementId::ChannelTitle => println!("--- #{text} ---"),
            ElementId::UsernameDisplay => println!("signed in as {text}"),
            other => println!("{}: {text}", other.as_str()),
        }
    }

    fn replace_children(&self, container: ElementId, nodes: Vec<Node>) {
        match container {
            ElementId::ChannelList => {
                println!("channels:");
                for (index, node) in nodes.iter().enumerate() {
                    println!("  {:>2}) {node}", index + 1);
                }
            }
            ElementId::OnlineUsers => {
                let avatars: Vec<String> = nodes.iter().map(ToString::to_string).collect();
                println!("online: {}", avatars.join(" "));
            }
            _ => {
                for node in &nodes {
                    println!("{node}");
                }
            }
        }
    }

    fn scroll_to_bottom(&self, container: ElementId) {
        debug!(container = container.as_str(), "view: scrolled");
    }

    fn clear_input(&self, element: ElementId) {
        debug!(element = element.as_str(), "view: input cleared");
    }

    fn alert(&self, message: &str) {
        println!("!! {message}");
    }

    fn navigate(&self, page: Page) {
        info!(page = page.as_str(), "view: navigate");
        if let Ok(mut screen) = self.screen.lock() {
            screen.pending = Some(page);
        }
    }
}
