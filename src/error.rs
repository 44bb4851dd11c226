//! # Erros do Pipeline
//!
//! Taxonomia de erros tipados. Problemas de qualidade de dados (bloco sem
//! paciente, valor ilegível, status desconhecido) **não** são erros: o parser
//! descarta ou assume defaults e apenas reporta contagens. Só falhas
//! estruturais chegam ao chamador.

use thiserror::Error;

/// Validação do texto colado, antes do parse.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Mensagem vazia: cole os dados dos atendimentos")]
    EmptyInput,

    #[error("Campo \"Horário\" não encontrado")]
    MissingTimeSlot,

    #[error("Campo \"Paciente\" não encontrado")]
    MissingPatient,
}

/// Falhas do armazenamento local (chave-valor).
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Erro de E/S no armazenamento local: {0}")]
    Io(#[from] std::io::Error),

    #[error("Erro de serialização: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Falhas do backup remoto. Sempre tratadas como não-fatais.
#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("Falha de comunicação com o backup remoto: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Backup remoto respondeu HTTP {0}")]
    Status(u16),

    #[error("Backup remoto recusou a operação")]
    Rejected,
}

/// Falhas de importação de documento de backup.
///
/// A importação é tudo-ou-nada: qualquer um destes erros deixa o estado
/// atual intacto.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Documento inválido: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Formato inválido: campo \"{0}\" não encontrado")]
    MissingField(&'static str),

    #[error("Dados de {0} inválidos")]
    InvalidCollection(&'static str),
}

/// Erro guarda-chuva usado pelo orquestrador e pela camada web.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Validation(#[from] ParseError),

    #[error(transparent)]
    Import(#[from] ImportError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Coleção desconhecida: {0}")]
    UnknownCollection(String),

    #[error("Data inválida: {0}")]
    InvalidDate(String),
}
