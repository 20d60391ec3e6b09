use std::path::Path;

use anyhow::{anyhow, Context, Result};
use mlua::prelude::*;
use mlua::LuaSerdeExt;

use crate::layout::Selector;
use crate::logger;
use crate::workflow::{RawWorkflow, Workflow};

/// Helper to convert mlua::Error -> anyhow::Error
fn lua_err(e: mlua::Error) -> anyhow::Error {
    anyhow!("{}", e)
}

/// Evaluate a workflow script and validate the table it returns.
///
/// The script must return `{ id = ..., name = ..., description = ...,
/// actions = { { type = "move", ... }, ... } }`. Actions use the same
/// field names as JSON workflows.
pub fn load_workflow_script(path: &Path) -> Result<Workflow> {
    let lua = Lua::new();
    let tag = path
        .parent()
        .and_then(|d| d.file_name())
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    register_globals(&lua, &tag).map_err(lua_err)?;

    // Set package.path so require() finds modules next to the script
    if let Some(dir) = path.parent() {
        let dir_str = dir.to_string_lossy();
        let pkg: LuaTable = lua.globals().get("package").map_err(lua_err)?;
        pkg.set("path", format!("{}/?.lua;{}/?/init.lua", dir_str, dir_str)).map_err(lua_err)?;
    }

    let code = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let value: LuaValue = lua
        .load(&code)
        .set_name(path.to_string_lossy())
        .eval()
        .map_err(lua_err)?;

    if !value.is_table() {
        return Err(anyhow!("{} must return a workflow table", path.display()));
    }
    let raw: RawWorkflow = lua.from_value(value).map_err(lua_err)?;
    Ok(Workflow::from_raw(raw))
}

/// Register the F.* global table into a Lua state.
fn register_globals(lua: &Lua, tag: &str) -> mlua::Result<()> {
    let f_table = lua.create_table()?;

    // F.log(msg), prefixed with the script folder name
    let tag = tag.to_string();
    if !tag.is_empty() {
        logger::register_prefix(&tag, logger::COLOR_BLUE);
    }
    let log_fn = lua.create_function(move |_, msg: String| {
        if tag.is_empty() {
            logger::info_p("lua", &msg);
        } else {
            logger::info_p(&tag, &msg);
        }
        Ok(())
    })?;
    f_table.set("log", log_fn)?;

    // Selector builders, so scripts need not spell attribute names.
    f_table.set("cell", lua.create_function(|_, id: String| Ok(Selector::cell(&id).to_string()))?)?;
    f_table.set("app", lua.create_function(|_, id: String| Ok(Selector::app_icon(&id).to_string()))?)?;
    f_table.set("dock", lua.create_function(|_, id: String| Ok(Selector::dock_icon(&id).to_string()))?)?;

    lua.globals().set("F", f_table)?;
    Ok(())
}
