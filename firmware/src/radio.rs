use button_gateway::{LinkEvent, LinkListener, Modem, RadioMode, RegistrationStatus};
use embassy_executor::{SpawnError, Spawner};
use embassy_net::Stack;
use embassy_time::{Duration as EmbassyDuration, Timer};
use esp_radio::wifi::{ClientConfig, ModeConfig, WifiController, WifiError, WifiEvent};
use log::{debug, error, info};

const SSID: &str = env!("SSID");
const PASSWORD: &str = env!("PASSWORD");

#[derive(Debug)]
pub enum RadioError {
    Wifi(WifiError),
    Spawn(SpawnError),
    /// Registration was already requested and the controller handed off.
    ControllerInUse,
}

/// Station-mode WiFi link standing in for the wide-area radio.
pub struct WifiRadio {
    controller: Option<WifiController<'static>>,
    stack: Stack<'static>,
    spawner: Spawner,
}

impl WifiRadio {
    pub fn new(controller: WifiController<'static>, stack: Stack<'static>, spawner: Spawner) -> Self {
        Self {
            controller: Some(controller),
            stack,
            spawner,
        }
    }
}

impl Modem for WifiRadio {
    type Error = RadioError;

    async fn init(&mut self) -> Result<(), Self::Error> {
        let controller = self.controller.as_mut().ok_or(RadioError::ControllerInUse)?;
        let client_config = ModeConfig::Client(
            ClientConfig::default()
                .with_ssid(SSID.into())
                .with_password(PASSWORD.into()),
        );
        controller
            .set_config(&client_config)
            .map_err(RadioError::Wifi)?;
        debug!("Starting wifi");
        controller.start_async().await.map_err(RadioError::Wifi)?;
        debug!("Wifi started!");
        Ok(())
    }

    async fn connect_async(
        &mut self,
        listener: &'static (dyn LinkListener + Sync),
    ) -> Result<(), Self::Error> {
        let controller = self.controller.take().ok_or(RadioError::ControllerInUse)?;
        self.spawner
            .spawn(link_task(controller, self.stack, listener))
            .map_err(RadioError::Spawn)
    }
}

/// Keeps the station associated and reports link progress as registration events.
#[embassy_executor::task]
async fn link_task(
    mut controller: WifiController<'static>,
    stack: Stack<'static>,
    listener: &'static (dyn LinkListener + Sync),
) {
    loop {
        listener.on_event(LinkEvent::RegistrationStatus(RegistrationStatus::Searching));
        debug!("About to connect...");

        match controller.connect_async().await {
            Ok(()) => {
                info!("Wifi connected!");
                listener.on_event(LinkEvent::RadioModeChanged(RadioMode::Connected));

                // Sockets are usable once DHCP has configured the stack
                stack.wait_config_up().await;
                if let Some(config) = stack.config_v4() {
                    debug!("Got IP: {}", config.address);
                }
                listener.on_event(LinkEvent::RegistrationStatus(
                    RegistrationStatus::RegisteredHome,
                ));

                controller.wait_for_event(WifiEvent::StaDisconnected).await;
                info!("Disconnected from WiFi, will attempt to reconnect...");
                listener.on_event(LinkEvent::RadioModeChanged(RadioMode::Idle));
                listener.on_event(LinkEvent::RegistrationStatus(
                    RegistrationStatus::NotRegistered,
                ));
            }
            Err(e) => {
                error!("Failed to connect to wifi: {e:?}");
                listener.on_event(LinkEvent::RegistrationStatus(
                    RegistrationStatus::RegistrationDenied,
                ));
                Timer::after(EmbassyDuration::from_millis(5000)).await;
            }
        }
    }
}
