// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![cfg_attr(docsrs, feature(doc_cfg_hide))]

mod binding;
mod connection_string;
pub mod constants;
mod error;
pub mod expression;
mod query;
mod registry;
mod resolver;
mod settings;

pub use binding::*;
pub use connection_string::*;
pub use error::*;
pub use expression::{BindingData, BindingExpression};
pub use query::*;
pub use registry::*;
pub use resolver::{BindingResolver, ContainerProvisioning, ResolvedBinding};
pub use settings::*;
