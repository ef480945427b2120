//! Declared handler signatures and their resolution against a context.
//!
//! A handler states up front which parameters it wants and where each one
//! comes from. Context parameters are filled from the
//! [`InvocationContext`] lookup table; argument parameters are filled by the
//! caller from ordinary request arguments, falling back to their default.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::context::InvocationContext;
use crate::error::Failure;
use crate::request::Principal;
use crate::sentinel::Sentinel;

/// Where a parameter's value comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamSource {
    /// Injected from the invocation context
    Context(Sentinel),
    /// Supplied by the caller, with an optional default
    Argument {
        /// Value used when the caller supplies none
        default: Option<Value>,
    },
}

/// One declared parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    name: String,
    source: ParamSource,
}

impl Param {
    /// Parameter name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parameter source.
    pub fn source(&self) -> &ParamSource {
        &self.source
    }
}

/// The declared parameter list of a handler.
///
/// # Examples
///
/// ```
/// use invoke_core::{InvocationContext, Principal, Sentinel, Signature};
/// use serde_json::json;
///
/// let sig = Signature::new()
///     .arg("title")
///     .context("user", Sentinel::Identity)
///     .arg_or("limit", 10);
///
/// let ctx = InvocationContext::new("req-1")
///     .with_identity(Some(Principal { id: "u1".into(), name: "Alice".into() }));
///
/// let args = sig.resolve(&ctx).unwrap();
/// assert_eq!(args.get("user").unwrap()["id"], json!("u1"));
/// assert_eq!(args.get("limit"), Some(&json!(10)));
/// assert_eq!(args.get("title"), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Signature {
    params: Vec<Param>,
    identity_required: Option<String>,
}

impl Signature {
    /// An empty signature.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a parameter injected from the context.
    pub fn context(self, name: impl Into<String>, sentinel: Sentinel) -> Self {
        self.param(name.into(), ParamSource::Context(sentinel))
    }

    /// Declares a caller-supplied parameter with no default.
    pub fn arg(self, name: impl Into<String>) -> Self {
        self.param(name.into(), ParamSource::Argument { default: None })
    }

    /// Declares a caller-supplied parameter with a default.
    pub fn arg_or(self, name: impl Into<String>, default: impl Into<Value>) -> Self {
        self.param(
            name.into(),
            ParamSource::Argument {
                default: Some(default.into()),
            },
        )
    }

    /// Requires an identity; resolution fails with
    /// [`Failure::Unauthenticated`] carrying `message` when there is none.
    pub fn require_identity(mut self, message: impl Into<String>) -> Self {
        self.identity_required = Some(message.into());
        self
    }

    /// Declared parameters, in declaration order.
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// The message used when a required identity is missing.
    pub fn identity_requirement(&self) -> Option<&str> {
        self.identity_required.as_deref()
    }

    /// Redeclaring a name replaces the earlier declaration in place.
    fn param(mut self, name: String, source: ParamSource) -> Self {
        match self.params.iter_mut().find(|p| p.name == name) {
            Some(existing) => existing.source = source,
            None => self.params.push(Param { name, source }),
        }
        self
    }

    /// Binds context parameters and argument defaults.
    ///
    /// Pure: the context is only read.
    ///
    /// # Errors
    ///
    /// Returns [`Failure::Unauthenticated`] if an identity is required and the
    /// context has none.
    pub fn resolve(&self, ctx: &InvocationContext) -> Result<BoundArgs, Failure> {
        let identity = match &self.identity_required {
            Some(message) => Some(authenticated(ctx.identity(), message)?.clone()),
            None if self.wants(Sentinel::Identity) => ctx.identity().cloned(),
            None => None,
        };

        let slots = self
            .params
            .iter()
            .map(|p| match &p.source {
                ParamSource::Context(sentinel) => Slot {
                    name: p.name.clone(),
                    sentinel: Some(*sentinel),
                    value: Some(ctx.lookup(*sentinel)),
                },
                ParamSource::Argument { default } => Slot {
                    name: p.name.clone(),
                    sentinel: None,
                    value: default.clone(),
                },
            })
            .collect();

        Ok(BoundArgs { slots, identity })
    }

    fn wants(&self, sentinel: Sentinel) -> bool {
        self.params
            .iter()
            .any(|p| p.source == ParamSource::Context(sentinel))
    }
}

/// Returns the identity itself, or [`Failure::Unauthenticated`] with `message`.
///
/// ```
/// use invoke_core::{authenticated, Failure, Principal};
///
/// let alice = Principal { id: "u1".into(), name: "Alice".into() };
/// assert_eq!(authenticated(Some(&alice), "please log in"), Ok(&alice));
/// assert_eq!(
///     authenticated(None, "please log in"),
///     Err(Failure::unauthenticated("please log in"))
/// );
/// ```
pub fn authenticated<'a>(
    identity: Option<&'a Principal>,
    message: &str,
) -> Result<&'a Principal, Failure> {
    identity.ok_or_else(|| Failure::unauthenticated(message))
}

#[derive(Debug, Clone, PartialEq)]
struct Slot {
    name: String,
    sentinel: Option<Sentinel>,
    value: Option<Value>,
}

/// Arguments bound for one call, addressed by parameter name.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundArgs {
    slots: Vec<Slot>,
    identity: Option<Principal>,
}

impl BoundArgs {
    /// Fills argument parameters from caller-supplied values.
    ///
    /// Context parameters are never overwritten, so a request payload cannot
    /// impersonate injected context. Unknown names are ignored.
    pub fn with_arguments(mut self, arguments: &Map<String, Value>) -> Self {
        for slot in self.slots.iter_mut().filter(|s| s.sentinel.is_none()) {
            if let Some(v) = arguments.get(&slot.name) {
                slot.value = Some(v.clone());
            }
        }
        self
    }

    /// Binds one argument parameter. Returns `false` if no such argument
    /// parameter was declared.
    pub fn bind(&mut self, name: &str, value: impl Into<Value>) -> bool {
        match self
            .slots
            .iter_mut()
            .find(|s| s.name == name && s.sentinel.is_none())
        {
            Some(slot) => {
                slot.value = Some(value.into());
                true
            }
            None => false,
        }
    }

    /// The bound value, or `None` if the parameter is unbound or undeclared.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.slots
            .iter()
            .find(|s| s.name == name)
            .and_then(|s| s.value.as_ref())
    }

    /// The bound value.
    ///
    /// # Errors
    ///
    /// Returns [`Failure::InvalidInput`] naming the parameter when unbound.
    pub fn require(&self, name: &str) -> Result<&Value, Failure> {
        self.get(name).ok_or_else(|| missing(name))
    }

    /// The bound value deserialized into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`Failure::InvalidInput`] when unbound, or with a detail entry
    /// under `name` when the value does not fit `T`.
    pub fn get_as<T: DeserializeOwned>(&self, name: &str) -> Result<T, Failure> {
        let value = self.require(name)?;
        serde_json::from_value(value.clone()).map_err(|e| {
            let mut details = Map::new();
            details.insert(name.to_string(), Value::String(e.to_string()));
            Failure::InvalidInput {
                message: Some(format!("invalid value for '{}'", name)),
                details,
            }
        })
    }

    /// The injected identity, when the signature asked for one.
    pub fn identity(&self) -> Option<&Principal> {
        self.identity.as_ref()
    }

    /// Names of unbound parameters, in declaration order.
    pub fn unbound(&self) -> impl Iterator<Item = &str> + '_ {
        self.slots
            .iter()
            .filter(|s| s.value.is_none())
            .map(|s| s.name.as_str())
    }

    /// The bound values as a mapping; unbound parameters are omitted.
    pub fn to_map(&self) -> Map<String, Value> {
        self.slots
            .iter()
            .filter_map(|s| s.value.clone().map(|v| (s.name.clone(), v)))
            .collect()
    }
}

fn missing(name: &str) -> Failure {
    Failure::invalid_input(format!("missing argument '{}'", name))
}
