//! Live-reload messages and the browser client.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Path of the live-reload websocket.
pub const RELOAD_SOCKET_PATH: &str = "/__livereload";

/// Path the client script is served from.
pub const RELOAD_SCRIPT_PATH: &str = "/__livereload.js";

/// Messages sent to connected browsers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReloadMessage {
    /// Connection established
    Connected,

    /// Full page reload
    Reload,

    /// Only stylesheets changed; swap them in place
    Css,
}

/// Broadcasts reload messages to every connected client.
#[derive(Debug, Clone)]
pub struct ReloadHub {
    sender: broadcast::Sender<ReloadMessage>,
}

impl ReloadHub {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(100);
        Self { sender }
    }

    /// Send a message to all connected clients.
    pub fn send(&self, msg: ReloadMessage) {
        // No receivers just means no browser is open.
        let _ = self.sender.send(msg);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReloadMessage> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ReloadHub {
    fn default() -> Self {
        Self::new()
    }
}

/// The tag injected into served HTML pages.
pub fn script_tag() -> String {
    format!(r#"<script src="{}"></script>"#, RELOAD_SCRIPT_PATH)
}

/// Insert the client script tag before `</body>`, or append it.
pub fn inject_script(html: &str) -> String {
    let tag = script_tag();
    match html.rfind("</body>") {
        Some(pos) => format!("{}{}{}", &html[..pos], tag, &html[pos..]),
        None => format!("{}{}", html, tag),
    }
}

/// Client-side script that listens for reload messages.
pub fn client_script() -> String {
    format!(
        r#"
(function() {{
  'use strict';

  var scheme = location.protocol === 'https:' ? 'wss://' : 'ws://';
  var ws = new WebSocket(scheme + location.host + '{}');

  function refreshStyles() {{
    var links = document.querySelectorAll('link[rel="stylesheet"]');
    links.forEach(function(link) {{
      var url = new URL(link.href);
      if (url.host !== location.host) return;
      url.searchParams.set('livereload', Date.now());
      link.href = url.toString();
    }});
  }}

  ws.onmessage = function(event) {{
    var msg = JSON.parse(event.data);

    switch (msg.type) {{
      case 'reload':
        location.reload();
        break;

      case 'css':
        refreshStyles();
        break;

      case 'connected':
        console.log('[livereload] connected');
        break;
    }}
  }};

  ws.onclose = function() {{
    console.log('[livereload] disconnected, retrying');
    setTimeout(function() {{ location.reload(); }}, 1000);
  }};
}})();
"#,
        RELOAD_SOCKET_PATH
    )
}
