use std::borrow::Cow;

/// Arrival time of an inbound message, as supplied by the transport.
pub type Timestamp = u64;

/// A single message argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Int(i32),
    Float(f32),
    Str(String),
    Blob(Vec<u8>),
}

impl Arg {
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Arg::Int(v) => Some(*v),
            Arg::Float(v) => Some(*v as i32),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Arg::Float(v) => Some(*v),
            Arg::Int(v) => Some(*v as f32),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Arg::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl From<i32> for Arg {
    fn from(v: i32) -> Self {
        Arg::Int(v)
    }
}

impl From<f32> for Arg {
    fn from(v: f32) -> Self {
        Arg::Float(v)
    }
}

impl From<&str> for Arg {
    fn from(v: &str) -> Self {
        Arg::Str(v.to_string())
    }
}

impl From<String> for Arg {
    fn from(v: String) -> Self {
        Arg::Str(v)
    }
}

/// An inbound message: a command name plus its arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    name: String,
    args: Vec<Arg>,
}

impl Message {
    pub fn new(name: impl Into<String>, args: Vec<Arg>) -> Self {
        Self { name: name.into(), args }
    }

    /// Command name exactly as received.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &[Arg] {
        &self.args
    }

    pub fn arg(&self, index: usize) -> Option<&Arg> {
        self.args.get(index)
    }
}

/// Returns `name` with a leading `/`, the form listeners are keyed by.
///
/// Servers are inconsistent about the separator on reply names, so both
/// registration and dispatch go through this.
pub fn canonical_command(name: &str) -> Cow<'_, str> {
    if name.starts_with('/') {
        Cow::Borrowed(name)
    } else {
        Cow::Owned(format!("/{}", name))
    }
}
