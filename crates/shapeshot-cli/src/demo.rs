//! A small browser-like surface for the `demo` command.

use std::rc::Rc;

use shapeshot_host::{HostObject, HostValue, MemObject};

use crate::cli::Flavor;

pub const CHROMIUM_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/120.0.6099.109 Safari/537.36";
pub const GECKO_UA: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0";

pub fn user_agent(flavor: Flavor) -> &'static str {
    match flavor {
        Flavor::Chromium => CHROMIUM_UA,
        Flavor::Gecko => GECKO_UA,
    }
}

/// Build a window-like root object.
pub fn window(flavor: Flavor) -> Rc<MemObject> {
    let object_proto = MemObject::new("Object");
    object_proto.set_object("toString", MemObject::function("Function"));
    object_proto.set_object("hasOwnProperty", MemObject::function("Function"));

    let event_target = MemObject::new("EventTarget");
    event_target.set_prototype(Some(object_proto.clone()));
    event_target.set_object("addEventListener", MemObject::function("Function"));

    let window = MemObject::new("Window");
    window.set_prototype(Some(event_target.clone()));
    window.set_object("window", window.clone());
    window.set_object("self", window.clone());
    window.set("devicePixelRatio", 1);
    window.set("name", "");
    window.set_object("alert", MemObject::function("Function"));
    window.set_object("fetch", MemObject::function("Function"));

    let navigator = MemObject::new("Navigator");
    navigator.set_prototype(Some(object_proto.clone()));
    navigator.set("userAgent", user_agent(flavor));
    navigator.set("onLine", true);
    navigator.define_constant("hardwareConcurrency", 8);
    window.set_object("navigator", navigator.clone());

    let document = MemObject::new("Document");
    document.set_prototype(Some(event_target));
    document.set("title", "demo");
    document.set_object("defaultView", window.clone());
    let weak_window = Rc::downgrade(&window);
    document.define_getter("location", move || {
        weak_window
            .upgrade()
            .map(|w| w.get("location"))
            .unwrap_or(Ok(HostValue::Undefined))
    });
    window.set_object("document", document);

    let location = MemObject::new("Location");
    location.set("href", "https://example.test/");
    location.define_throwing("ancestorOrigins", "SecurityError");
    window.set_object("location", location);

    let style = MemObject::new("CSSStyleDeclaration");
    style.set("transform", "none");
    style.set("userSelect", "auto");

    match flavor {
        Flavor::Chromium => {
            window.set_object("chrome", MemObject::new("Object"));
            window.set_object("clientInformation", navigator);
            style.define_hidden("webkitTransform", "none");
            style.define_hidden_throwing("webkitUserSelect", "NotSupportedError");
        }
        Flavor::Gecko => {
            window.set_object("InstallTrigger", MemObject::new("Object"));
            navigator.set("buildID", "20100101");
            style.define_hidden("mozUserSelect", "auto");
        }
    }
    window.set_object("style", style);

    window
}
