// Copyright 2025 Stoolap Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Parameter binding for SQL statements
//!
//! Parameters are referenced as `?` (numbered left to right) or `$n`.
//!
//! ```ignore
//! use stoolap_client::{connect, params, Config};
//!
//! let conn = connect(":memory:", Config::default())?;
//! conn.execute("CREATE TABLE users (id INTEGER, name TEXT)", ())?;
//! conn.execute("INSERT INTO users VALUES (?, ?)", (1, "Alice"))?;
//! conn.execute("INSERT INTO users VALUES ($1, $2)", params![2, "Bob"])?;
//! conn.executemany("INSERT INTO users VALUES (?, ?)", vec![(3, "Carol"), (4, "Dave")])?;
//! ```

use std::sync::Arc;

use crate::core::Value;

/// Trait for types that can be converted to SQL parameters
pub trait ToParam {
    /// Convert self into a Value for SQL parameter binding
    fn to_param(&self) -> Value;
}

macro_rules! impl_to_param {
    ($($t:ty => |$v:ident| $conv:expr;)+) => {
        $(
            impl ToParam for $t {
                fn to_param(&self) -> Value {
                    let $v = self;
                    $conv
                }
            }
        )+
    };
}

impl_to_param! {
    i8 => |v| Value::Integer(i64::from(*v));
    i16 => |v| Value::Integer(i64::from(*v));
    i32 => |v| Value::Integer(i64::from(*v));
    i64 => |v| Value::Integer(*v);
    u8 => |v| Value::Integer(i64::from(*v));
    u16 => |v| Value::Integer(i64::from(*v));
    u32 => |v| Value::Integer(i64::from(*v));
    usize => |v| Value::Integer(*v as i64);
    f32 => |v| Value::Float(f64::from(*v));
    f64 => |v| Value::Float(*v);
    bool => |v| Value::Boolean(*v);
    str => |v| Value::text(v);
    String => |v| Value::text(v);
    Arc<str> => |v| Value::Text(Arc::clone(v));
    Value => |v| v.clone();
}

impl<T: ToParam> ToParam for Option<T> {
    fn to_param(&self) -> Value {
        match self {
            Some(v) => v.to_param(),
            None => Value::Null,
        }
    }
}

impl<T: ToParam + ?Sized> ToParam for &T {
    fn to_param(&self) -> Value {
        T::to_param(self)
    }
}

/// One set of positional parameters
pub trait Params {
    /// Convert into a Vec of Values
    fn into_params(self) -> Vec<Value>;
}

impl Params for () {
    fn into_params(self) -> Vec<Value> {
        Vec::new()
    }
}

impl Params for &[Value] {
    fn into_params(self) -> Vec<Value> {
        self.to_vec()
    }
}

impl Params for Vec<Value> {
    fn into_params(self) -> Vec<Value> {
        self
    }
}

impl<const N: usize> Params for [Value; N] {
    fn into_params(self) -> Vec<Value> {
        Vec::from(self)
    }
}

macro_rules! tuple_params {
    ($(($($idx:tt $T:ident),+))+) => {
        $(
            impl<$($T: ToParam),+> Params for ($($T,)+) {
                fn into_params(self) -> Vec<Value> {
                    vec![$(self.$idx.to_param()),+]
                }
            }
        )+
    };
}

tuple_params! {
    (0 A)
    (0 A, 1 B)
    (0 A, 1 B, 2 C)
    (0 A, 1 B, 2 C, 3 D)
    (0 A, 1 B, 2 C, 3 D, 4 E)
    (0 A, 1 B, 2 C, 3 D, 4 E, 5 F)
    (0 A, 1 B, 2 C, 3 D, 4 E, 5 F, 6 G)
    (0 A, 1 B, 2 C, 3 D, 4 E, 5 F, 6 G, 7 H)
}

/// Create a parameter list
///
/// ```ignore
/// conn.execute("INSERT INTO users VALUES ($1, $2)", params![1, "Alice"])?;
/// ```
#[macro_export]
macro_rules! params {
    () => {
        ()
    };
    ($($param:expr),+ $(,)?) => {
        ($($param,)+)
    };
}
