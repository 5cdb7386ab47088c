use crate::mach::settings::{Mode, Settings};

/// ## Renderer
///
/// Accumulates the text form of objects. Two targets: the screen (obeys
/// the display settings) and files (canonical settings, so the text
/// re-parses bit-exact: period separator, no digit grouping, no fancy
/// exponents, full precision).

pub struct Renderer {
    out: String,
    file: bool,
    pub settings: Settings,
}

impl Renderer {
    pub fn new(settings: Settings) -> Renderer {
        Renderer {
            out: String::new(),
            file: false,
            settings,
        }
    }

    pub fn file(mut settings: Settings) -> Renderer {
        settings.mode = Mode::Std;
        settings.digits = settings.precision;
        settings.decimal_separator = '.';
        settings.exponent_separator = 'E';
        settings.mantissa_spacing = 0;
        settings.fraction_spacing = 0;
        settings.fancy_exponent = false;
        settings.trailing_decimal = true;
        Renderer {
            out: String::new(),
            file: true,
            settings,
        }
    }

    pub fn is_file(&self) -> bool {
        self.file
    }

    pub fn put(&mut self, s: &str) {
        self.out.push_str(s);
    }

    pub fn put_char(&mut self, c: char) {
        self.out.push(c);
    }

    /// Separator between consecutive objects in a composite.
    pub fn space(&mut self) {
        if !self.out.ends_with(' ') && !self.out.is_empty() {
            self.out.push(' ');
        }
    }

    pub fn size(&self) -> usize {
        self.out.len()
    }

    pub fn take(self) -> String {
        self.out
    }
}
