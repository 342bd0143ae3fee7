use std::fmt;

use serde::Deserialize;
use thirtyfour::error::WebDriverError;
use thirtyfour::{ChromiumLikeCapabilities, DesiredCapabilities, WebDriver};

use crate::configuration::WebDriverSettings;

/// Browser engines the test matrix runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    Chrome,
    Firefox,
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Engine::Chrome => write!(f, "chrome"),
            Engine::Firefox => write!(f, "firefox"),
        }
    }
}

/// One live WebDriver connection. Exclusively owned by the workflow run that
/// created it and closed when the run ends, on every exit path.
pub struct Session {
    driver: WebDriver,
}

impl Session {
    pub async fn connect(settings: &WebDriverSettings, engine: Engine) -> Result<Self, WebDriverError> {
        let driver = match engine {
            Engine::Chrome => {
                let mut caps = DesiredCapabilities::chrome();
                if settings.headless {
                    caps.set_headless()?;
                }
                WebDriver::new(&settings.url, caps).await?
            }
            Engine::Firefox => {
                let mut caps = DesiredCapabilities::firefox();
                if settings.headless {
                    caps.set_headless()?;
                }
                WebDriver::new(&settings.url, caps).await?
            }
        };
        driver.maximize_window().await?;

        Ok(Session { driver })
    }

    /// Handle for adapters; the underlying session stays owned by `self`.
    pub fn driver(&self) -> WebDriver {
        self.driver.clone()
    }

    pub async fn close(self) -> Result<(), WebDriverError> {
        self.driver.quit().await
    }
}
