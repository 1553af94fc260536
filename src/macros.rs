/// Builds a [`Value`](crate::Value) from a JSON-like literal.
///
/// Object keys must be literals and keep the order they are written in.
/// Anything that is not `null`, `true`, `false`, an array or an object is
/// treated as a Rust expression and converted with [`to_value`](crate::to_value).
///
/// ```rust
/// use toon_value::{toon, Value};
///
/// let limit = 10;
/// let value = toon!({
///     "name": "Ada",
///     "offset": -2,
///     "limit": limit,
///     "tags": ["math", "engines"],
///     "meta": {}
/// });
/// assert_eq!(value.get("offset"), Some(&Value::Int(-2)));
/// assert_eq!(value.get("limit"), Some(&Value::Int(10)));
/// ```
#[macro_export]
macro_rules! toon {
    // Array elements, split on top-level commas.
    (@array [$($elems:expr,)*]) => {
        vec![$($elems,)*]
    };
    (@array [$($elems:expr,)*] $($rest:tt)+) => {
        $crate::toon!(@element [$($elems,)*] () $($rest)+)
    };
    (@element [$($elems:expr,)*] ($($cur:tt)+) , $($rest:tt)*) => {
        $crate::toon!(@array [$($elems,)* $crate::toon!($($cur)+),] $($rest)*)
    };
    (@element [$($elems:expr,)*] ($($cur:tt)*) $next:tt $($rest:tt)*) => {
        $crate::toon!(@element [$($elems,)*] ($($cur)* $next) $($rest)*)
    };
    (@element [$($elems:expr,)*] ($($cur:tt)+)) => {
        $crate::toon!(@array [$($elems,)* $crate::toon!($($cur)+),])
    };

    // Object entries, inserted one at a time to keep their order.
    (@object $object:ident ()) => {};
    (@object $object:ident () $key:literal : $($rest:tt)+) => {
        $crate::toon!(@entry $object [$key] () $($rest)+)
    };
    (@entry $object:ident [$key:tt] ($($cur:tt)+) , $($rest:tt)*) => {
        $object.insert(($key).to_string(), $crate::toon!($($cur)+));
        $crate::toon!(@object $object () $($rest)*);
    };
    (@entry $object:ident [$key:tt] ($($cur:tt)*) $next:tt $($rest:tt)*) => {
        $crate::toon!(@entry $object [$key] ($($cur)* $next) $($rest)*)
    };
    (@entry $object:ident [$key:tt] ($($cur:tt)+)) => {
        $object.insert(($key).to_string(), $crate::toon!($($cur)+));
    };

    (null) => {
        $crate::Value::Null
    };

    (true) => {
        $crate::Value::Bool(true)
    };

    (false) => {
        $crate::Value::Bool(false)
    };

    ([]) => {
        $crate::Value::Array(vec![])
    };

    ([ $($tt:tt)+ ]) => {
        $crate::Value::Array($crate::toon!(@array [] $($tt)+))
    };

    ({}) => {
        $crate::Value::Object($crate::ToonMap::new())
    };

    ({ $($tt:tt)+ }) => {{
        let mut object = $crate::ToonMap::new();
        $crate::toon!(@object object () $($tt)+);
        $crate::Value::Object(object)
    }};

    // Any other expression goes through serde.
    ($other:expr) => {
        $crate::to_value(&$other).unwrap_or($crate::Value::Null)
    };
}
