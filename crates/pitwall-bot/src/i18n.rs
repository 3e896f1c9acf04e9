//! Message catalog.
//!
//! English is the default for every message; other languages override a
//! subset and fall back to English for the rest.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    #[default]
    English,
    Spanish,
}

impl Language {
    /// Unknown codes fall back to English.
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_ascii_lowercase().as_str() {
            "es" | "es-es" | "spanish" => Self::Spanish,
            _ => Self::English,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Msg {
    BackTo,
    Greeting,
    CommandIntro,
    MenuCommandHelp,
    MenuTitle,
    ButtonLive,
    ButtonSettings,
    ButtonStint,
    ButtonGrid,
    ButtonInfo,
    ServerOffline,
    ServerNoData,
    NotLimited,
    Track,
    TimeLeft,
    Session,
    Laps,
    CarsInSession,
    Rain,
    Temperature,
    GridTitle,
    NoDriversInSession,
    BestLap,
    BestLapSectors,
    LastLap,
    LastLapSectors,
    OptimumLap,
    OptimumLapSectors,
    Status,
    Info,
    Gap,
    LiveMap,
    Times,
    Sectors,
    Car,
    Class,
    Driver,
    HeaderName,
    HeaderLap,
    HeaderLast,
    HeaderBest,
    HeaderOptimum,
    HeaderTopSpeed,
    ChooseDriver,
    StintTitle,
    NoDataForDriver,
    NoLapsInSession,
    CarImageTimeout,
    CarImageFailed,
    NotificationsTitle,
    NotificationToggleFailed,
    NotificationsReadFailed,
    NotificationsForeignUser,
    NewSessionStarted,
}

fn english(msg: Msg) -> &'static str {
    match msg {
        Msg::BackTo => "Back to",
        Msg::Greeting => {
            "Hello, I am a bot that allows you to get information about ongoing sessions."
        }
        Msg::CommandIntro => "You can use the following command:",
        Msg::MenuCommandHelp => "Show the bot menu",
        Msg::MenuTitle => "Bot menu.",
        Msg::ButtonLive => "Live",
        Msg::ButtonSettings => "Settings",
        Msg::ButtonStint => "Stint",
        Msg::ButtonGrid => "Grid",
        Msg::ButtonInfo => "Info",
        Msg::ServerOffline => "Server {} is offline",
        Msg::ServerNoData => "No data received from server {}",
        Msg::NotLimited => "Not Limited",
        Msg::Track => "Track",
        Msg::TimeLeft => "Time left",
        Msg::Session => "Session",
        Msg::Laps => "Laps",
        Msg::CarsInSession => "Cars in session",
        Msg::Rain => "Rain",
        Msg::Temperature => "Temperature (Track/Ambient)",
        Msg::GridTitle => "Time left: {}\nServer: \"{}\"",
        Msg::NoDriversInSession => "There are no drivers in the session",
        Msg::BestLap => "Best Lap",
        Msg::BestLapSectors => "Best Lap Sect.",
        Msg::LastLap => "Last Lap",
        Msg::LastLapSectors => "Last Lap Sect.",
        Msg::OptimumLap => "Optimum",
        Msg::OptimumLapSectors => "Optimum Sect.",
        Msg::Status => "Status 🏎️",
        Msg::Info => "Info 👐",
        Msg::Gap => "Gap ⏳",
        Msg::LiveMap => "Map 🗺️",
        Msg::Times => "Times",
        Msg::Sectors => "Sectors",
        Msg::Car => "Car",
        Msg::Class => "Class",
        Msg::Driver => "Driver",
        Msg::HeaderName => "Name",
        Msg::HeaderLap => "Lap",
        Msg::HeaderLast => "Last",
        Msg::HeaderBest => "Best",
        Msg::HeaderOptimum => "Optimum",
        Msg::HeaderTopSpeed => "Top Speed",
        Msg::ChooseDriver => "Choose the driver from the list:",
        Msg::StintTitle => "Time left: {}\nData for {} in \"{}\"",
        Msg::NoDataForDriver => "No data for driver {}",
        Msg::NoLapsInSession => "There are no laps in the session",
        Msg::CarImageTimeout => {
            "The waiting time for downloading the car image for {} has expired"
        }
        Msg::CarImageFailed => "Could not read the image of the car {}: {}",
        Msg::NotificationsTitle => "Notification status\n(Only notifies the first session)",
        Msg::NotificationToggleFailed => "Could not change notification status",
        Msg::NotificationsReadFailed => "Could not read notifications for user",
        Msg::NotificationsForeignUser => "These notification settings belong to another user",
        Msg::NewSessionStarted => "New session started:",
    }
}

fn spanish(msg: Msg) -> Option<&'static str> {
    let text = match msg {
        Msg::BackTo => "Volver a",
        Msg::Greeting => {
            "Hola, soy un bot que te permite obtener información sobre las sesiones en curso."
        }
        Msg::CommandIntro => "Puedes usar el siguiente comando:",
        Msg::MenuCommandHelp => "Muestra el menú del bot",
        Msg::MenuTitle => "Menú del bot.",
        Msg::ButtonSettings => "Ajustes",
        Msg::ButtonGrid => "Parrilla",
        Msg::ServerOffline => "El servidor {} no está disponible",
        Msg::ServerNoData => "No se reciben datos del servidor {}",
        Msg::NotLimited => "Sin límite",
        Msg::Track => "Circuito",
        Msg::TimeLeft => "Tiempo restante",
        Msg::Session => "Sesión",
        Msg::Laps => "Vueltas",
        Msg::CarsInSession => "Coches en sesión",
        Msg::Rain => "Lluvia",
        Msg::Temperature => "Temperatura (Pista/Ambiente)",
        Msg::GridTitle => "Tiempo restante: {}\nServidor: \"{}\"",
        Msg::NoDriversInSession => "No hay pilotos en la sesión",
        Msg::BestLap => "Mejor Vuelta",
        Msg::BestLapSectors => "Sectores MV.",
        Msg::LastLap => "Última Vuelta",
        Msg::LastLapSectors => "Sectores UV.",
        Msg::OptimumLap => "Óptimo",
        Msg::OptimumLapSectors => "Sectores O.",
        Msg::Status => "Estado 🏎️",
        Msg::Times => "Tiempos",
        Msg::Sectors => "Sectores",
        Msg::Car => "Coche",
        Msg::Class => "Clase",
        Msg::Driver => "Piloto",
        Msg::HeaderName => "Nombre",
        Msg::HeaderLap => "Vuelta",
        Msg::HeaderLast => "Última",
        Msg::HeaderBest => "Mejor",
        Msg::HeaderOptimum => "Óptimo",
        Msg::HeaderTopSpeed => "Máx. Vel",
        Msg::ChooseDriver => "Elige el piloto de la lista:",
        Msg::StintTitle => "Tiempo restante: {}\nDatos de {} en \"{}\"",
        Msg::NoDataForDriver => "No hay datos del piloto {}",
        Msg::NoLapsInSession => "No hay vueltas en la sesión",
        Msg::CarImageTimeout => {
            "Se ha agotado el tiempo de espera de la imagen del coche de {}"
        }
        Msg::CarImageFailed => "No se pudo leer la imagen del coche {}: {}",
        Msg::NotificationsTitle => {
            "Estado de las notificaciones\n(Solo se notifica la primera sesión)"
        }
        Msg::NotificationToggleFailed => "No se pudo cambiar el estado de la notificación",
        Msg::NotificationsReadFailed => "No se pudieron leer las notificaciones del usuario",
        Msg::NewSessionStarted => "Nueva sesión iniciada:",
        _ => return None,
    };
    Some(text)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Localizer {
    language: Language,
}

impl Localizer {
    pub fn new(language: Language) -> Self {
        Self { language }
    }

    pub fn from_code(code: &str) -> Self {
        Self::new(Language::from_code(code))
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn get(&self, msg: Msg) -> &'static str {
        match self.language {
            Language::English => english(msg),
            Language::Spanish => spanish(msg).unwrap_or_else(|| english(msg)),
        }
    }

    /// Fills each `{}` of the message with the next argument, in order.
    pub fn format(&self, msg: Msg, args: &[&str]) -> String {
        let template = self.get(msg);
        let mut out = String::with_capacity(template.len());
        let mut args = args.iter();
        let mut rest = template;
        while let Some(pos) = rest.find("{}") {
            out.push_str(&rest[..pos]);
            out.push_str(args.next().copied().unwrap_or_default());
            rest = &rest[pos + 2..];
        }
        out.push_str(rest);
        out
    }
}
