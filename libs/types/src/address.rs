//! Transport addresses
//!
//! A participant is reachable through exactly one [`Address`] at a time. The
//! variant decides which messaging stub carries the message: in-process
//! addresses receive the structured [`crate::Message`], every other kind
//! receives serialized bytes.

use crate::TypesError;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Discriminant of [`Address`], used to select stub and serializer factories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressKind {
    InProcess,
    Channel,
    Mqtt,
    WebSocket,
    WebSocketClient,
    Browser,
    CommonApiDbus,
}

impl AddressKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AddressKind::InProcess => "in_process",
            AddressKind::Channel => "channel",
            AddressKind::Mqtt => "mqtt",
            AddressKind::WebSocket => "web_socket",
            AddressKind::WebSocketClient => "web_socket_client",
            AddressKind::Browser => "browser",
            AddressKind::CommonApiDbus => "common_api_dbus",
        }
    }
}

impl fmt::Display for AddressKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InProcessAddress {
    /// Id of the local receiver this address delivers to
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelAddress {
    pub messaging_endpoint_url: String,
    pub channel_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MqttAddress {
    pub broker_uri: String,
    pub topic: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WebSocketProtocol {
    Ws,
    Wss,
}

impl WebSocketProtocol {
    pub fn scheme(&self) -> &'static str {
        match self {
            WebSocketProtocol::Ws => "ws",
            WebSocketProtocol::Wss => "wss",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WebSocketAddress {
    pub protocol: WebSocketProtocol,
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub path: String,
}

impl WebSocketAddress {
    pub fn new(
        protocol: WebSocketProtocol,
        host: impl Into<String>,
        port: u16,
        path: impl Into<String>,
    ) -> Self {
        Self {
            protocol,
            host: host.into(),
            port,
            path: path.into(),
        }
    }

    /// Render as `ws(s)://host:port/path`
    pub fn to_url(&self) -> Result<Url, TypesError> {
        let path = self.path.trim_start_matches('/');
        let raw = format!(
            "{}://{}:{}/{}",
            self.protocol.scheme(),
            self.host,
            self.port,
            path
        );
        Url::parse(&raw).map_err(|e| TypesError::invalid_address(raw, e.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WebSocketClientAddress {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BrowserAddress {
    pub window_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommonApiDbusAddress {
    pub domain: String,
    pub service_name: String,
    pub participant_id: String,
}

/// Closed set of transport addresses
///
/// Serialized as an internally tagged JSON object, e.g.
/// `{"type":"mqtt","broker_uri":"tcp://broker:1883","topic":"t"}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Address {
    InProcess(InProcessAddress),
    Channel(ChannelAddress),
    Mqtt(MqttAddress),
    WebSocket(WebSocketAddress),
    WebSocketClient(WebSocketClientAddress),
    Browser(BrowserAddress),
    CommonApiDbus(CommonApiDbusAddress),
}

impl Address {
    pub fn in_process(id: impl Into<String>) -> Self {
        Address::InProcess(InProcessAddress { id: id.into() })
    }

    pub fn mqtt(broker_uri: impl Into<String>, topic: impl Into<String>) -> Self {
        Address::Mqtt(MqttAddress {
            broker_uri: broker_uri.into(),
            topic: topic.into(),
        })
    }

    pub fn channel(messaging_endpoint_url: impl Into<String>, channel_id: impl Into<String>) -> Self {
        Address::Channel(ChannelAddress {
            messaging_endpoint_url: messaging_endpoint_url.into(),
            channel_id: channel_id.into(),
        })
    }

    pub fn web_socket_client(id: impl Into<String>) -> Self {
        Address::WebSocketClient(WebSocketClientAddress { id: id.into() })
    }

    pub fn kind(&self) -> AddressKind {
        match self {
            Address::InProcess(_) => AddressKind::InProcess,
            Address::Channel(_) => AddressKind::Channel,
            Address::Mqtt(_) => AddressKind::Mqtt,
            Address::WebSocket(_) => AddressKind::WebSocket,
            Address::WebSocketClient(_) => AddressKind::WebSocketClient,
            Address::Browser(_) => AddressKind::Browser,
            Address::CommonApiDbus(_) => AddressKind::CommonApiDbus,
        }
    }

    pub fn is_in_process(&self) -> bool {
        matches!(self, Address::InProcess(_))
    }

    /// Apply `f` to every free-form string field
    ///
    /// Used by configuration loading to expand environment references.
    pub fn map_strings<E>(
        &mut self,
        mut f: impl FnMut(&str) -> Result<String, E>,
    ) -> Result<(), E> {
        match self {
            Address::InProcess(a) => a.id = f(&a.id)?,
            Address::Channel(a) => {
                a.messaging_endpoint_url = f(&a.messaging_endpoint_url)?;
                a.channel_id = f(&a.channel_id)?;
            }
            Address::Mqtt(a) => {
                a.broker_uri = f(&a.broker_uri)?;
                a.topic = f(&a.topic)?;
            }
            Address::WebSocket(a) => {
                a.host = f(&a.host)?;
                a.path = f(&a.path)?;
            }
            Address::WebSocketClient(a) => a.id = f(&a.id)?,
            Address::Browser(a) => a.window_id = f(&a.window_id)?,
            Address::CommonApiDbus(a) => {
                a.domain = f(&a.domain)?;
                a.service_name = f(&a.service_name)?;
                a.participant_id = f(&a.participant_id)?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::InProcess(a) => write!(f, "in_process:{}", a.id),
            Address::Channel(a) => write!(f, "channel:{}@{}", a.channel_id, a.messaging_endpoint_url),
            Address::Mqtt(a) => write!(f, "mqtt:{}#{}", a.broker_uri, a.topic),
            Address::WebSocket(a) => write!(
                f,
                "{}://{}:{}/{}",
                a.protocol.scheme(),
                a.host,
                a.port,
                a.path.trim_start_matches('/')
            ),
            Address::WebSocketClient(a) => write!(f, "web_socket_client:{}", a.id),
            Address::Browser(a) => write!(f, "browser:{}", a.window_id),
            Address::CommonApiDbus(a) => {
                write!(f, "dbus:{}:{}:{}", a.domain, a.service_name, a.participant_id)
            }
        }
    }
}
