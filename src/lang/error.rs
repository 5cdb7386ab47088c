#[derive(Debug, PartialEq, Clone)]
pub struct Error {
    code: u16,
    position: Option<usize>,
    message: Option<String>,
}

macro_rules! error {
    ($err:ident) => {
        $crate::lang::Error::from_code($crate::lang::ErrorCode::$err)
    };
    ($err:ident; $msg:expr) => {
        $crate::lang::Error::from_code($crate::lang::ErrorCode::$err).message($msg)
    };
    ($err:ident, $pos:expr) => {
        $crate::lang::Error::from_code($crate::lang::ErrorCode::$err).at($pos)
    };
    ($err:ident, $pos:expr; $msg:expr) => {
        $crate::lang::Error::from_code($crate::lang::ErrorCode::$err)
            .at($pos)
            .message($msg)
    };
}

#[repr(u16)]
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum ErrorCode {
    SyntaxError = 1,
    Unterminated = 2,
    MissingVariable = 3,
    ExponentWithoutDigits = 4,
    TooManyDigits = 5,
    TypeMismatch = 10,
    BadArgumentValue = 11,
    DivisionByZero = 20,
    DomainError = 21,
    Overflow = 22,
    OutOfMemory = 30,
    TooFewArguments = 31,
    TooManyLocals = 32,
    InvalidLocal = 33,
    UndefinedName = 34,
    FileNotFound = 40,
    FileNameTooLong = 41,
    MalformedState = 42,
    Interrupted = 50,
    InternalError = 51,
}

impl Error {
    pub fn from_code(code: ErrorCode) -> Error {
        Error {
            code: code as u16,
            position: None,
            message: None,
        }
    }

    pub fn code(&self) -> u16 {
        self.code
    }

    pub fn is_interrupt(&self) -> bool {
        self.code == ErrorCode::Interrupted as u16
    }

    /// Attach the source position where the error was detected.
    /// An already-recorded position wins: inner parsers know best.
    pub fn at(mut self, position: usize) -> Error {
        if self.position.is_none() {
            self.position = Some(position);
        }
        self
    }

    pub fn message(mut self, message: &str) -> Error {
        self.message = Some(message.to_string());
        self
    }

    pub fn position(&self) -> Option<usize> {
        self.position
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let s = match self.code {
            1 => "Syntax Error",
            2 => "Unterminated",
            3 => "Missing Variable Name",
            4 => "Exponent Without Digits",
            5 => "Too Many Digits",
            10 => "Bad Argument Type",
            11 => "Bad Argument Value",
            20 => "Divide By Zero",
            21 => "Domain Error",
            22 => "Overflow",
            30 => "Insufficient Memory",
            31 => "Too Few Arguments",
            32 => "Too Many Locals",
            33 => "Invalid Local",
            34 => "Undefined Name",
            40 => "File Not Found",
            41 => "File Name Too Long",
            42 => "Malformed State File",
            50 => "Interrupted",
            51 => "Internal Error",
            _ => "",
        };
        if s.is_empty() {
            write!(f, "Error {}", self.code)?;
        } else {
            write!(f, "{}", s)?;
        }
        if let Some(message) = &self.message {
            write!(f, ": {}", message)?;
        }
        Ok(())
    }
}
