// Button event gateway
// 1. Start an HTTP server accepting `POST /api/events` with a JSON body
//    (replies 201 on success), reachable from the WiFi network.
// 2. Run the app
// SSID="<ssid>" PASSWORD="<password>" SERVER_HOST="<IP or hostname>" SERVER_PORT="5000" cargo r -r
// 3. Once LED2 is on, press the BOOT button: every press is posted as a
//    `button_press` event. Presses during a send are merged into one.
#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
#![deny(clippy::large_stack_frames)]

mod net;
mod radio;

use button_gateway::{
    AppContext, ButtonMonitor, ButtonTransition, Gateway, GatewayConfig, configure_modem,
    register_button_handler,
};
use embassy_executor::Spawner;
use embassy_net::{Runner, StackResources};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use esp_alloc as _;
use esp_backtrace as _;
use esp_hal::{
    clock::CpuClock,
    gpio::{Input, InputConfig, Level, Output, OutputConfig, Pull},
    interrupt::software::SoftwareInterruptControl,
    ram,
    rng::Rng,
    timer::timg::TimerGroup,
};
use esp_radio::{Controller, wifi::WifiDevice};
use log::info;

use crate::net::EmbassyNet;
use crate::radio::WifiRadio;

esp_bootloader_esp_idf::esp_app_desc!();

// When you are okay with using a nightly compiler it's better to use https://docs.rs/static_cell/2.1.0/static_cell/macro.make_static.html
macro_rules! mk_static {
    ($t:ty,$val:expr) => {{
        static STATIC_CELL: static_cell::StaticCell<$t> = static_cell::StaticCell::new();
        #[deny(unused_attributes)]
        let x = STATIC_CELL.uninit().write(($val));
        x
    }};
}

static CONTEXT: AppContext<CriticalSectionRawMutex> = AppContext::new();

type Monitor = ButtonMonitor<'static, CriticalSectionRawMutex, Output<'static>>;

#[esp_rtos::main]
async fn main(spawner: Spawner) -> ! {
    esp_println::logger::init_logger_from_env();
    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    esp_alloc::heap_allocator!(#[ram(reclaimed)] size: 64 * 1024);
    esp_alloc::heap_allocator!(size: 36 * 1024);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    let sw_int = SoftwareInterruptControl::new(peripherals.SW_INTERRUPT);
    esp_rtos::start(timg0.timer0, sw_int.software_interrupt0);

    let gateway_config = GatewayConfig::default();

    // LED1 mirrors the button, LED2 lights up once the network is attached
    let led1 = Output::new(peripherals.GPIO7, Level::Low, OutputConfig::default());
    let led2 = Output::new(peripherals.GPIO6, Level::Low, OutputConfig::default());
    // BOOT button on ESP32-C3, active low
    let button = Input::new(
        peripherals.GPIO9,
        InputConfig::default().with_pull(Pull::Up),
    );

    let monitor = ButtonMonitor::new(gateway_config.button_id, led1, &CONTEXT.pending)
        .expect("Failed to initialize LEDs");
    let button_id = gateway_config.button_id;
    register_button_handler(monitor, |monitor| {
        spawner.spawn(button_task(button, monitor, button_id))
    })
    .expect("Failed to initialize buttons");

    let esp_radio_ctrl = &*mk_static!(
        Controller<'static>,
        esp_radio::init().expect("Failed to initialize radio controller")
    );
    let (controller, interfaces) =
        esp_radio::wifi::new(esp_radio_ctrl, peripherals.WIFI, Default::default())
            .expect("Failed to create WiFi controller");

    let rng = Rng::new();
    let seed = (rng.random() as u64) << 32 | rng.random() as u64;
    let (stack, runner) = embassy_net::new(
        interfaces.sta,
        embassy_net::Config::dhcpv4(Default::default()),
        mk_static!(StackResources<3>, StackResources::<3>::new()),
        seed,
    );
    spawner.spawn(net_task(runner)).ok();

    let mut radio = WifiRadio::new(controller, stack, spawner);
    configure_modem(&mut radio, &CONTEXT.attachment)
        .await
        .expect("Failed to configure radio");

    let mut gateway = Gateway::new(&CONTEXT, EmbassyNet::new(stack), led2, &gateway_config)
        .expect("Failed to initialize LEDs");
    info!(
        "Waiting for network, events go to {}:{}",
        gateway_config.server_host, gateway_config.server_port
    );
    gateway.run().await
}

#[embassy_executor::task]
async fn button_task(mut button: Input<'static>, mut monitor: Monitor, button_id: u8) {
    loop {
        button.wait_for_any_edge().await;
        let transition = if button.is_low() {
            ButtonTransition::pressed(button_id)
        } else {
            ButtonTransition::released(button_id)
        };
        monitor.on_transition(transition);
    }
}

#[embassy_executor::task]
async fn net_task(mut runner: Runner<'static, WifiDevice<'static>>) {
    runner.run().await
}
