//! Live-reload messages and the hub that fans them out to browsers.

use plinth_pipeline::{OutputChange, ReloadSink};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// WebSocket endpoint the client connects to.
pub const WS_PATH: &str = "/__plinth/ws";

/// Where the client script is served.
pub const CLIENT_PATH: &str = "/__plinth/client.js";

/// Messages pushed to connected browsers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReloadMessage {
    /// Connection established
    Connected,

    /// Full page reload
    Reload,

    /// Re-fetch these stylesheets without reloading
    Css { paths: Vec<String> },
}

impl From<OutputChange> for ReloadMessage {
    fn from(change: OutputChange) -> Self {
        match change {
            OutputChange::Reload => ReloadMessage::Reload,
            OutputChange::Styles { paths } => ReloadMessage::Css { paths },
        }
    }
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

    /// Send to all clients. Nothing happens when none are connected.
    pub fn send(&self, msg: ReloadMessage) {
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

impl ReloadSink for ReloadHub {
    fn notify(&self, change: OutputChange) {
        tracing::debug!("Pushing {:?} to {} client(s)", change, self.subscriber_count());
        self.send(change.into());
    }
}

/// Browser side of live reload.
pub fn client_script() -> String {
    format!(
        r#"(function() {{
  'use strict';

  var url = (location.protocol === 'https:' ? 'wss://' : 'ws://') + location.host + '{ws}';
  var retries = 0;

  function swapStyles(paths) {{
    var links = document.querySelectorAll('link[rel="stylesheet"]');
    var swapped = 0;
    links.forEach(function(link) {{
      var href = new URL(link.href, location.href);
      if (paths.indexOf(href.pathname) === -1) return;
      href.searchParams.set('t', Date.now());
      link.href = href.toString();
      swapped++;
    }});
    if (swapped === 0) location.reload();
  }}

  function connect(reconnecting) {{
    var ws = new WebSocket(url);

    ws.onopen = function() {{
      retries = 0;
      if (reconnecting) location.reload();
    }};

    ws.onmessage = function(event) {{
      var msg = JSON.parse(event.data);
      switch (msg.type) {{
        case 'reload':
          location.reload();
          break;
        case 'css':
          swapStyles(msg.paths);
          break;
        case 'connected':
          console.log('[plinth] live reload connected');
          break;
      }}
    }};

    ws.onclose = function() {{
      if (retries++ < 10) {{
        setTimeout(function() {{ connect(true); }}, 500 * retries);
      }}
    }};
  }}

  connect(false);
}})();
"#,
        ws = WS_PATH
    )
}
