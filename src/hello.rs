//! The demo application: greets whoever `?name=` says, by default
//! the person in `DEFAULT_NAME`.

use anyhow::Result;
use serde::Serialize;

use crate::auri::QueryArgs;
use crate::component::{mount, Component, ComponentCore};
use crate::context::Context;

pub const DEFAULT_NAME: &str = "Fred Irving Johnathan Bradley Peppergill";

pub struct HelloComponent<'c> {
    core: ComponentCore<'c>,
}

#[derive(Serialize)]
struct HelloModel<'t> {
    name: &'t str,
    site_name: Option<String>,
    names: &'t [&'t str],
    home: String,
}

impl<'c> HelloComponent<'c> {
    pub fn new(context: &'c dyn Context) -> Self {
        HelloComponent { core: ComponentCore::new(context, "") }
    }
}

impl<'c> Component for HelloComponent<'c> {
    fn initialize_state(&mut self) {
        self.core.state().set_default("name", DEFAULT_NAME);
    }

    fn execute(&mut self) -> Result<String> {
        let name = self.core.state().get("name")
            .map(|n| n.to_string())
            .unwrap_or_else(|| DEFAULT_NAME.into());
        let site_name =
            if self.core.has("site_name") {
                Some((*self.core.get::<String>("site_name")?).clone())
            } else {
                None
            };
        let model = HelloModel {
            name: &name,
            site_name,
            names: &["Ada", "Grace"],
            home: self.core.url("", Some(&QueryArgs::new().without("name")))?,
        };
        Ok(self.core.render("hello.tpl", &model)?)
    }
}

/// `ComponentFactory` for the root.
pub fn hello_component<'c>(context: &'c dyn Context) -> Result<Box<dyn Component + 'c>> {
    Ok(mount(HelloComponent::new(context)))
}
