#![no_std]
#![no_main]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::wildcard_imports)]

use defmt_rtt as _;
use panic_probe as _;

#[rtic::app(device = stm32f0xx_hal::pac, dispatchers = [USART1, TIM14])]
mod app {
    use defmt::{panic, *};
    use floor_guard::{
        board::{self, BusPin, SenseLine, SensorPower},
        config::{DISCOVERY_POLICY, SENSOR_RESOLUTION, SERIAL_BAUD},
        controller::Thresholds,
        onewire::OneWire,
        status::{self, LOCATING_SENSOR, STARTED_UP, STARTING_UP},
        temp_controller::FloorGuard,
        thermometer::ds18b20::Ds18b20Thermometer,
    };
    use rtic_monotonics::{
        stm32::{Tim2 as Mono, *},
        Monotonic,
    };
    use stm32f0xx_hal::{
        adc::Adc,
        delay::Delay,
        gpio::{gpioa::PA2, Alternate, AF1},
        pac::{IWDG, USART2},
        prelude::*,
        serial::Serial,
        watchdog::Watchdog,
    };

    type Console = Serial<USART2, PA2<Alternate<AF1>>, ()>;

    #[shared]
    struct Shared {}

    #[local]
    struct Local {
        guard: FloorGuard<SenseLine>,
        console: Console,
        power: SensorPower,
    }

    #[init]
    fn init(mut cx: init::Context) -> (Shared, Local) {
        // Set system clock to 24 MHz
        let mut rcc = cx
            .device
            .RCC
            .configure()
            .hsi48()
            .sysclk(24.mhz())
            .pclk(24.mhz())
            .hclk(24.mhz())
            .freeze(&mut cx.device.FLASH);

        trace!("sysclk: {}", rcc.clocks.sysclk().0);

        // Enable tim2 monotonic
        let token = rtic_monotonics::create_stm32_tim2_monotonic_token!();
        Mono::start(24_000_000, token);

        let gpioa = cx.device.GPIOA.split(&mut rcc);

        // The thermostat gets its line back before anything else happens
        let adc = Adc::new(cx.device.ADC, &mut rcc);
        let line = SenseLine::new(gpioa.pa0.into_analog(&cx.cs), adc);
        let guard = unwrap!(FloorGuard::new(line, Thresholds::DEFAULT));

        // Status console, TX only
        let console = Serial::usart2tx(
            cx.device.USART2,
            gpioa.pa2.into_alternate_af1(&cx.cs),
            SERIAL_BAUD.bps(),
            &mut rcc,
        );

        // Setup DS18B20
        let (power, wire) = board::sensor_bus(gpioa.pa8, gpioa.pa11, gpioa.pa12, &cx.cs);
        let delay = Delay::new(cx.core.SYST, &rcc);

        let _ = watchdog::spawn(cx.device.IWDG);
        let _ = control_loop::spawn(wire, delay);

        (
            Shared {},
            Local {
                guard,
                console,
                power,
            },
        )
    }

    #[idle]
    fn idle(_: idle::Context) -> ! {
        loop {
            cortex_m::asm::wfi();
        }
    }

    #[task(priority = 1)]
    async fn watchdog(_: watchdog::Context, wdg: IWDG) {
        let mut wdg = Watchdog::new(wdg);
        wdg.start(1.hz());

        loop {
            wdg.feed();
            Mono::delay(100.millis()).await;
        }
    }

    #[task(priority = 2, local = [guard, console, power])]
    async fn control_loop(cx: control_loop::Context, wire: OneWire<BusPin>, delay: Delay) {
        let guard = cx.local.guard;
        let console = cx.local.console;
        // Keeps the sensor powered
        let _power = cx.local.power;

        announce(console, STARTING_UP);

        let mut thermometer = match Ds18b20Thermometer::initialize(
            wire,
            delay,
            SENSOR_RESOLUTION,
            DISCOVERY_POLICY,
            |attempt| {
                warn!("Sensor not found, attempt {=u32}", attempt);
                announce(console, LOCATING_SENSOR);
            },
        )
        .await
        {
            Ok(thermometer) => thermometer,
            Err(e) => panic!("Sensor discovery failed: {=str}", e.as_str()),
        };

        announce(console, STARTED_UP);
        info!("Started up, sensor {}, {}", thermometer.sensor().address(), guard.thresholds());

        loop {
            trace!("control_loop");

            let uptime = || Mono::now().duration_since_epoch().to_millis();
            match guard.cycle(&mut thermometer, console, uptime).await {
                Ok(cycle) => {
                    if let Some(transition) = cycle.transition {
                        info!("Transition: {}", transition);
                    }
                    debug!("{}", cycle);
                }
                Err(e) => error!("Cycle failed: {=str} ({})", e.as_str(), e),
            }
        }
    }

    /// Boot messages are informational, a console that can't take one is only logged.
    fn announce(console: &mut Console, msg: &str) {
        if status::announce(console, msg).is_err() {
            warn!("Console write failed: {=str}", msg);
        }
    }

    timestamp!("{=u64:us}", {
        Mono::now().duration_since_epoch().to_micros()
    });
}
