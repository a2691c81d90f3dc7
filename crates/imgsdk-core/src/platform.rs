use crate::SdkError;

/// Host platform an environment is created for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Platform {
    Android = 0,
    Ios = 1,
}

impl TryFrom<i32> for Platform {
    type Error = SdkError;

    fn try_from(raw: i32) -> Result<Self, Self::Error> {
        match raw {
            0 => Ok(Platform::Android),
            1 => Ok(Platform::Ios),
            other => Err(SdkError::InvalidPlatform(other)),
        }
    }
}

impl From<Platform> for i32 {
    fn from(p: Platform) -> i32 {
        p as i32
    }
}
