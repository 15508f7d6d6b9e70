use crate::{commands, Command, Error, Result};

/// Immutable registry of the known commands, built once at startup.
///
/// Registration enforces global uniqueness of both names and encoded
/// payloads; a duplicate is a construction-time error, not something to
/// discover on the wire.
#[derive(Debug, Default)]
pub struct CommandCatalog {
    entries: Vec<&'static Command>,
}

impl CommandCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard catalog: the commands and inquiry bases this crate
    /// ships in [`commands`].
    pub fn standard() -> Result<Self> {
        let mut catalog = Self::new();
        catalog.register(&commands::IF_CLEAR)?;
        catalog.register(&commands::RESET)?;
        catalog.register(&commands::POWER_ON)?;
        catalog.register(&commands::POWER_OFF)?;
        catalog.register(&commands::HOME)?;
        catalog.register(commands::INQUIRE_POWER.command())?;
        catalog.register(commands::INQUIRE_ZOOM.command())?;
        catalog.register(commands::INQUIRE_VERSION.command())?;
        catalog.register(commands::INQUIRE_FOCUS_MODE.command())?;
        Ok(catalog)
    }

    pub fn register(&mut self, command: &'static Command) -> Result {
        for existing in &self.entries {
            if existing.name() == command.name() {
                return Err(Error::DuplicateCommand(format!(
                    "name '{}' is already registered",
                    command.name()
                )));
            }

            if existing.kind().type_byte() == command.kind().type_byte()
                && existing.payload() == command.payload()
            {
                return Err(Error::DuplicateCommand(format!(
                    "'{}' has the same message bytes as '{}'",
                    command.name(),
                    existing.name()
                )));
            }
        }

        self.entries.push(command);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&'static Command> {
        self.entries.iter().find(|c| c.name() == name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'static Command> + '_ {
        self.entries.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::commands::{HOME, POWER_ON};

    #[test]
    fn standard_catalog_builds() -> Result {
        let catalog = CommandCatalog::standard()?;
        assert_eq!(9, catalog.len());
        assert_eq!(Some(&HOME), catalog.get("Home"));
        assert!(catalog.get("No Such Command").is_none());
        Ok(())
    }

    #[test]
    fn duplicate_name_rejected() {
        static IMPOSTOR: Command = Command::new("Home", &[0x07, 0x07]);
        let mut catalog = CommandCatalog::new();
        catalog.register(&HOME).unwrap();
        assert!(matches!(
            catalog.register(&IMPOSTOR),
            Err(Error::DuplicateCommand(_))
        ));
    }

    #[test]
    fn duplicate_payload_rejected() {
        static IMPOSTOR: Command = Command::new("Power On Again", &[0x04, 0x00, 0x02]);
        let mut catalog = CommandCatalog::new();
        catalog.register(&POWER_ON).unwrap();
        assert!(matches!(
            catalog.register(&IMPOSTOR),
            Err(Error::DuplicateCommand(_))
        ));
    }

    #[test]
    fn round_trip_every_registered_command() -> Result {
        let catalog = CommandCatalog::standard()?;
        for command in catalog.iter() {
            for device_id in 0..=7 {
                let msg = command.to_message(device_id)?;
                assert_eq!(0x80 + device_id, msg[0]);
                assert_eq!(command.kind().type_byte(), msg[1]);
                assert_eq!(crate::TERMINATOR, *msg.last().unwrap());
                assert_eq!(command.message_len(), msg.len());
            }
        }
        Ok(())
    }
}
