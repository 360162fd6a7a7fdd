//! Node storage: the value model, the bound-object capability, and the
//! columnar arena every compiled graph lives in.

pub mod clone;
pub mod object;
pub mod registry;
pub mod types;
pub mod value;

pub use clone::CloneContext;
pub use object::{ChangeHandler, ChangeNotifier, NotifyChanged, Object, ObjectRef, PropertyBag, Subscription, SubscriptionKey};
pub use registry::Registry;
pub use types::{BindingMode, NodeId, NodeKind, NodeKindTag, NodeMetadata};
pub use value::{EnumValue, EqualityPolicy, ObjectType, Value, ValueType};
