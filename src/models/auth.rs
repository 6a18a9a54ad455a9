// src/models/auth.rs

use serde::{Deserialize, Serialize};

// Estrutura de dados ("claims") dentro do JWT.
// A emissão do token é externa; aqui só validamos.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i32,   // Subject (ID do empleado)
    pub exp: usize, // Expiration time
    pub iat: usize, // Issued At
}
