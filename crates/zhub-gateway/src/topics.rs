// Topics root.
const ROOT: &str = "gw";

/// The classes of inbound messages published by a gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundTopic {
    /// A device has joined the network.
    DeviceJoined,
    /// A device has left the network.
    DeviceLeft,
    /// A device has sent a cluster library response.
    ZclResponse,
}

impl InboundTopic {
    /// All inbound topic classes.
    pub const ALL: [Self; 3] = [Self::DeviceJoined, Self::DeviceLeft, Self::ZclResponse];

    /// Returns the topic suffix.
    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::DeviceJoined => "devicejoined",
            Self::DeviceLeft => "deviceleft",
            Self::ZclResponse => "zclresponse",
        }
    }

    fn from_suffix(suffix: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|topic| topic.suffix() == suffix)
    }
}

impl std::fmt::Display for InboundTopic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.suffix())
    }
}

// Outbound suffix.
const COMMANDS: &str = "commands";

/// The topics of a single gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    prefix: String,
    subscriptions: [String; 3],
    commands: String,
}

impl Topics {
    /// Creates the [`Topics`] of the gateway with the given address.
    #[must_use]
    pub fn new(gateway_address: &str) -> Self {
        let prefix = format!("{ROOT}/{gateway_address}/");
        Self {
            subscriptions: InboundTopic::ALL.map(|topic| format!("{prefix}{}", topic.suffix())),
            commands: format!("{prefix}{COMMANDS}"),
            prefix,
        }
    }

    /// Returns the topics to subscribe to.
    #[must_use]
    pub fn subscriptions(&self) -> &[String] {
        &self.subscriptions
    }

    /// Returns the topic where commands are published.
    #[must_use]
    pub fn commands(&self) -> &str {
        &self.commands
    }

    /// Classifies an inbound topic.
    ///
    /// Returns [`None`] for topics of other gateways and for unknown suffixes.
    #[must_use]
    pub fn classify(&self, topic: &str) -> Option<InboundTopic> {
        topic
            .strip_prefix(self.prefix.as_str())
            .and_then(InboundTopic::from_suffix)
    }
}
