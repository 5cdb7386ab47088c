/// ## Display and precision settings
///
/// A read-only context object the core consults while parsing, rendering
/// and computing. The evaluator never mutates it; the settings commands
/// and the front-end do, between evaluations.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Std,
    Sig,
    Fix,
    Sci,
    Eng,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub mode: Mode,
    /// Digits shown in Sig/Fix/Sci/Eng modes. Std shows everything.
    pub digits: usize,
    /// Significand digits kept by decimal arithmetic.
    pub precision: usize,
    /// Magnitude at which Std/Sig switch to scientific notation.
    pub std_exponent: i64,
    /// Emit a trailing decimal separator on integral decimals, so `1.`
    /// re-parses as a decimal and not an integer.
    pub trailing_decimal: bool,
    pub decimal_separator: char,
    pub exponent_separator: char,
    pub group_separator: char,
    /// Digit-group strides, 0 disables grouping.
    pub mantissa_spacing: usize,
    pub fraction_spacing: usize,
    /// Unicode superscript exponents on screen.
    pub fancy_exponent: bool,
    /// Error out instead of rounding when a literal has more digits than
    /// the precision allows.
    pub too_many_digits_error: bool,
    /// In Fix mode, minimum significant digits shown before switching to
    /// scientific notation (0 behaves like classic HP Fix).
    pub min_significant: i64,
}

impl Default for Settings {
    fn default() -> Settings {
        Settings {
            mode: Mode::Std,
            digits: 12,
            precision: 24,
            std_exponent: 9,
            trailing_decimal: true,
            decimal_separator: '.',
            exponent_separator: 'E',
            group_separator: ' ',
            mantissa_spacing: 0,
            fraction_spacing: 0,
            fancy_exponent: false,
            too_many_digits_error: false,
            min_significant: 0,
        }
    }
}

impl Settings {
    /// Kigits needed to hold the configured precision.
    pub fn precision_kigits(&self) -> usize {
        (self.precision + 2) / 3
    }
}
