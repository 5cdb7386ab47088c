use super::directory;
use super::object;
use super::runtime::Runtime;
use super::settings::Mode;
use crate::lang::render::Renderer;
use crate::lang::Error;
use std::io::Write;

type Result<T> = std::result::Result<T, Error>;

/// ## State files
///
/// A `.48S` state file is plain UTF-8 text replayed through the parser
/// and evaluator: each global variable's value followed by `'name' STO`,
/// then the operand stack from deepest to shallowest, then the settings
/// as commands. Rendering uses canonical settings so the text re-parses
/// to the same objects.

pub fn save_text(rt: &Runtime) -> Result<String> {
    let mut out = String::new();

    for (name, value) in directory::entries(rt, rt.home())? {
        let mut r = Renderer::file(rt.settings.clone());
        object::render(rt, value, &mut r)?;
        out.push_str(&r.take());
        out.push('\n');
        let name = super::text::text_of(rt, name)?;
        out.push('\'');
        out.push_str(&String::from_utf8_lossy(&name));
        out.push_str("' sto\n\n");
    }

    for &level in rt.stack_iter() {
        let mut r = Renderer::file(rt.settings.clone());
        object::render(rt, level, &mut r)?;
        out.push_str(&r.take());
        out.push('\n');
    }

    let s = &rt.settings;
    match s.mode {
        Mode::Std | Mode::Sig => out.push_str("std\n"),
        Mode::Fix => out.push_str(&format!("{} fix\n", s.digits)),
        Mode::Sci => out.push_str(&format!("{} sci\n", s.digits)),
        Mode::Eng => out.push_str(&format!("{} eng\n", s.digits)),
    }
    out.push_str(&format!("{} precision\n", s.precision));

    Ok(out)
}

/// Clear the runtime and replay a saved state.
pub fn load_text(rt: &mut Runtime, text: &str) -> Result<()> {
    rt.clear();
    rt.enter(text)
        .map_err(|e| error!(MalformedState; &e.to_string()))
}

pub fn save(rt: &Runtime, filename: &str) -> Result<()> {
    if filename.len() > 255 {
        return Err(error!(FileNameTooLong));
    }
    let text = save_text(rt)?;
    let mut file = std::fs::File::create(filename)
        .map_err(|e| error!(InternalError; &e.to_string()))?;
    file.write_all(text.as_bytes())
        .map_err(|e| error!(InternalError; &e.to_string()))?;
    Ok(())
}

pub fn load(rt: &mut Runtime, filename: &str) -> Result<()> {
    if filename.len() > 255 {
        return Err(error!(FileNameTooLong));
    }
    let text = std::fs::read_to_string(filename).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => error!(FileNotFound; filename),
        _ => error!(InternalError; &e.to_string()),
    })?;
    load_text(rt, &text)
}
